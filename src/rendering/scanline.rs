/// Scanline rasterization core.
///
/// Triangle fill walks the two trapezoid halves of a Y-sorted triangle,
/// interpolating span X bounds and depth in 16.16 fixed point so long spans
/// accumulate no floating error. Lines use depth-tested Bresenham stepping
/// with screen-space clipping performed beforehand.
use crate::count_add;
#[allow(unused_imports)]
use crate::perf::FUNCTION_COUNTERS;
use crate::rendering::framebuffer::{FrameTarget, PixelRect};
use glam::Vec3;

const F_SHIFT: u32 = 16;
const F_ONE: i64 = 1 << F_SHIFT;

/// Skip trapezoid halves flatter than this.
const HALF_EPS: f32 = 1e-4;

/// Depth bias for wire edges so they win ties against coplanar fill.
pub const WIRE_DEPTH_BIAS: f32 = 0.01;

/// Depth bias for point plots.
pub const POINT_DEPTH_BIAS: f32 = 0.05;

/// Dash pattern period in pixels; `wire_density` scales the lit fraction.
const DASH_PERIOD: i64 = 16;

/// Hard cap on Bresenham steps, guarding against malformed input.
const MAX_LINE_STEPS: u32 = 10_000;

/// Hard cap on Cohen-Sutherland refinement iterations.
const MAX_CLIP_ITERATIONS: u32 = 10;

// Outcodes for the 2D clipper.
const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

#[inline]
fn to_fixed(v: f32) -> i64 {
    (v * F_ONE as f32) as i64
}

#[inline]
fn ceil_fixed(v: i64) -> i64 {
    (v + F_ONE - 1) >> F_SHIFT
}

/// Fill one horizontal span with depth-tested pixels.
/// `fx`/`fz` arguments are 16.16 fixed point; pixels cover
/// `[ceil(fx1), ceil(fx2))` clamped to the rect.
#[inline]
fn draw_span(
    target: &mut FrameTarget<'_>,
    rect: &PixelRect,
    y: usize,
    mut fx1: i64,
    mut fx2: i64,
    mut fz1: i64,
    mut fz2: i64,
    color: u32,
) {
    if fx1 > fx2 {
        std::mem::swap(&mut fx1, &mut fx2);
        std::mem::swap(&mut fz1, &mut fz2);
    }

    let x_start = ceil_fixed(fx1).max(rect.x0 as i64);
    let x_end = ceil_fixed(fx2).min(rect.x1 as i64);
    if x_start >= x_end {
        return;
    }

    let dx_f = fx2 - fx1;
    let dz_dx = if dx_f > 0 { ((fz2 - fz1) << F_SHIFT) / dx_f } else { 0 };

    // Pre-step to the first covered pixel center.
    let prestep = (x_start << F_SHIFT) - fx1;
    let mut fz = fz1 + ((prestep * dz_dx) >> F_SHIFT);

    count_add!(FUNCTION_COUNTERS.spans_filled, 1);
    count_add!(FUNCTION_COUNTERS.span_pixels_tested, (x_end - x_start) as u64);

    let width = target.width;
    let mut index = y * width + x_start as usize;
    for _ in x_start..x_end {
        let z = fz as f32 / F_ONE as f32;
        if z > target.depth[index] {
            target.depth[index] = z;
            target.color[index] = color;
        }
        fz += dz_dx;
        index += 1;
    }
}

/// Rasterize one triangle with a per-pixel depth test, restricted to
/// `rect` (a tile or the full frame). Points carry (screen x, screen y,
/// inverse-view depth). The color is already intensity-scaled.
///
/// Degenerate halves and empty spans are skipped; triangles whose screen
/// bounding box is smaller than one pixel collapse to a single plot.
pub fn draw_triangle(
    target: &mut FrameTarget<'_>,
    rect: &PixelRect,
    p0: Vec3,
    p1: Vec3,
    p2: Vec3,
    color: u32,
) {
    if !(p0.x.is_finite() && p0.y.is_finite())
        || !(p1.x.is_finite() && p1.y.is_finite())
        || !(p2.x.is_finite() && p2.y.is_finite())
    {
        return;
    }

    // Sub-pixel punt: one depth-tested pixel instead of span setup.
    let min_x = p0.x.min(p1.x).min(p2.x);
    let max_x = p0.x.max(p1.x).max(p2.x);
    let min_y = p0.y.min(p1.y).min(p2.y);
    let max_y = p0.y.max(p1.y).max(p2.y);
    if max_x - min_x < 1.0 && max_y - min_y < 1.0 {
        let px = p0.x as i64;
        let py = p0.y as i64;
        if px >= rect.x0 as i64 && px < rect.x1 as i64 && py >= rect.y0 as i64 && py < rect.y1 as i64
        {
            target.set_pixel(px as usize, py as usize, color, p0.z);
        }
        return;
    }

    // Sort vertices by ascending Y.
    let (mut p0, mut p1, mut p2) = (p0, p1, p2);
    if p0.y > p1.y {
        std::mem::swap(&mut p0, &mut p1);
    }
    if p0.y > p2.y {
        std::mem::swap(&mut p0, &mut p2);
    }
    if p1.y > p2.y {
        std::mem::swap(&mut p1, &mut p2);
    }

    let dy01 = p1.y - p0.y;
    let dy02 = p2.y - p0.y;
    let dy12 = p2.y - p1.y;
    if dy02 <= HALF_EPS {
        return;
    }

    // Long-edge gradients are shared by both halves.
    let dx02_f = to_fixed((p2.x - p0.x) / dy02);
    let dz02_f = to_fixed((p2.z - p0.z) / dy02);
    let x0_f = to_fixed(p0.x);
    let z0_f = to_fixed(p0.z);

    // Upper trapezoid: p0-p1 edge against p0-p2 edge.
    if dy01 > HALF_EPS {
        let dx01_f = to_fixed((p1.x - p0.x) / dy01);
        let dz01_f = to_fixed((p1.z - p0.z) / dy01);

        let y_start = (p0.y.ceil() as i64).max(rect.y0 as i64);
        let y_end = (p1.y.ceil() as i64).min(rect.y1 as i64);
        for y in y_start..y_end {
            let dy = (y as f32 - p0.y) as f64;
            let fx1 = x0_f + (dy * dx01_f as f64) as i64;
            let fx2 = x0_f + (dy * dx02_f as f64) as i64;
            let fz1 = z0_f + (dy * dz01_f as f64) as i64;
            let fz2 = z0_f + (dy * dz02_f as f64) as i64;
            draw_span(target, rect, y as usize, fx1, fx2, fz1, fz2, color);
        }
    }

    // Lower trapezoid: p1-p2 edge against p0-p2 edge.
    if dy12 > HALF_EPS {
        let dx12_f = to_fixed((p2.x - p1.x) / dy12);
        let dz12_f = to_fixed((p2.z - p1.z) / dy12);
        let x1_f = to_fixed(p1.x);
        let z1_f = to_fixed(p1.z);

        let y_start = (p1.y.ceil() as i64).max(rect.y0 as i64);
        let y_end = (p2.y.ceil() as i64).min(rect.y1 as i64);
        for y in y_start..y_end {
            let dy_bot = (y as f32 - p1.y) as f64;
            let dy_top = (y as f32 - p0.y) as f64;
            let fx1 = x1_f + (dy_bot * dx12_f as f64) as i64;
            let fx2 = x0_f + (dy_top * dx02_f as f64) as i64;
            let fz1 = z1_f + (dy_bot * dz12_f as f64) as i64;
            let fz2 = z0_f + (dy_top * dz02_f as f64) as i64;
            draw_span(target, rect, y as usize, fx1, fx2, fz1, fz2, color);
        }
    }
}

/// Depth-tested Bresenham line with dashing.
///
/// Depth interpolates linearly by the Manhattan-distance fraction along the
/// segment. `density` in [0, 1] controls the lit fraction of each 16-pixel
/// dash period; 1.0 draws solid. Malformed endpoints (NaN/infinite) draw
/// nothing, and iteration is hard-capped.
pub fn draw_line(target: &mut FrameTarget<'_>, p0: Vec3, p1: Vec3, color: u32, density: f32) {
    if !p0.x.is_finite() || !p0.y.is_finite() || !p1.x.is_finite() || !p1.y.is_finite() {
        return;
    }

    count_add!(FUNCTION_COUNTERS.lines_drawn, 1);

    let dx = (p1.x - p0.x).abs() as i64;
    let dy = (p1.y - p0.y).abs() as i64;
    let sx: i64 = if p0.x < p1.x { 1 } else { -1 };
    let sy: i64 = if p0.y < p1.y { 1 } else { -1 };
    let mut err = dx - dy;

    let mut cur_x = p0.x as i64;
    let mut cur_y = p0.y as i64;
    let end_x = p1.x as i64;
    let end_y = p1.y as i64;

    let dash_threshold = (DASH_PERIOD as f32 * density.clamp(0.0, 1.0)) as i64;

    let width = target.width as i64;
    let height = target.height as i64;

    let mut step = 0i64;
    let mut remaining = MAX_LINE_STEPS;
    while remaining > 0 {
        remaining -= 1;

        if step % DASH_PERIOD < dash_threshold
            && cur_x >= 0
            && cur_x < width
            && cur_y >= 0
            && cur_y < height
        {
            let dist0 = (cur_x as f32 - p0.x).abs() + (cur_y as f32 - p0.y).abs();
            let dist1 = (end_x - cur_x).abs() as f32 + (end_y - cur_y).abs() as f32;
            let denom = dist0 + dist1;
            let t = if denom > 0.0 { dist0 / denom } else { 0.0 };
            let z = p0.z + (p1.z - p0.z) * t;
            target.set_pixel_biased(cur_x as usize, cur_y as usize, color, z, WIRE_DEPTH_BIAS);
        }

        if cur_x == end_x && cur_y == end_y {
            break;
        }
        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            cur_x += sx;
        }
        if e2 < dx {
            err += dx;
            cur_y += sy;
        }
        step += 1;
    }
}

#[inline]
fn out_code(x: f32, y: f32, width: f32, height: f32) -> u8 {
    let mut code = INSIDE;
    if x < 0.0 {
        code |= LEFT;
    } else if x >= width {
        code |= RIGHT;
    }
    if y < 0.0 {
        code |= TOP;
    } else if y >= height {
        code |= BOTTOM;
    }
    code
}

/// Cohen-Sutherland clip of a 2D segment against `[0,width) x [0,height)`.
/// Returns the clipped endpoints, or None when the segment lies fully
/// outside (or refinement fails to converge within the iteration cap).
pub fn clip_line(
    mut x0: f32,
    mut y0: f32,
    mut x1: f32,
    mut y1: f32,
    width: f32,
    height: f32,
) -> Option<(f32, f32, f32, f32)> {
    if !x0.is_finite() || !y0.is_finite() || !x1.is_finite() || !y1.is_finite() {
        return None;
    }

    let mut code0 = out_code(x0, y0, width, height);
    let mut code1 = out_code(x1, y1, width, height);

    for _ in 0..MAX_CLIP_ITERATIONS {
        if code0 | code1 == 0 {
            return Some((x0, y0, x1, y1));
        }
        if code0 & code1 != 0 {
            return None;
        }

        let outcode = if code0 != 0 { code0 } else { code1 };
        let dx = x1 - x0;
        let dy = y1 - y0;

        let (x, y) = if outcode & TOP != 0 {
            if dy.abs() < 0.001 {
                return None;
            }
            (x0 + dx * (0.0 - y0) / dy, 0.0)
        } else if outcode & BOTTOM != 0 {
            if dy.abs() < 0.001 {
                return None;
            }
            (x0 + dx * ((height - 1.0) - y0) / dy, height - 1.0)
        } else if outcode & RIGHT != 0 {
            if dx.abs() < 0.001 {
                return None;
            }
            (width - 1.0, y0 + dy * ((width - 1.0) - x0) / dx)
        } else {
            if dx.abs() < 0.001 {
                return None;
            }
            (0.0, y0 + dy * (0.0 - x0) / dx)
        };

        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        if outcode == code0 {
            x0 = x;
            y0 = y;
            code0 = out_code(x0, y0, width, height);
        } else {
            x1 = x;
            y1 = y;
            code1 = out_code(x1, y1, width, height);
        }
    }

    None
}

/// Depth-tested vertex plot for the POINTS draw mode.
/// `size` is the square plot footprint in pixels; `stride` subsamples the
/// vertex set for level-of-detail control.
pub fn draw_points(
    target: &mut FrameTarget<'_>,
    screen: &[f32],
    count: usize,
    color: u32,
    size: usize,
    stride: usize,
) {
    let stride = stride.max(1);
    let size = size.max(1);

    let mut i = 0usize;
    while i < count {
        let base = i * 4;
        if screen[base + 3] > 0.0 {
            let sx = screen[base] as i64;
            let sy = screen[base + 1] as i64;
            let sz = screen[base + 2];
            if sx >= 0 && sy >= 0 {
                count_add!(FUNCTION_COUNTERS.points_plotted, 1);
                for py in sy..sy + size as i64 {
                    for px in sx..sx + size as i64 {
                        target.set_pixel_biased(px as usize, py as usize, color, sz, POINT_DEPTH_BIAS);
                    }
                }
            }
        }
        i += stride;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::framebuffer::FAR_DEPTH;

    struct Frame {
        color: Vec<u32>,
        depth: Vec<f32>,
        width: usize,
        height: usize,
    }

    impl Frame {
        fn new(width: usize, height: usize) -> Self {
            Self {
                color: vec![0; width * height],
                depth: vec![FAR_DEPTH; width * height],
                width,
                height,
            }
        }

        fn target(&mut self) -> FrameTarget<'_> {
            FrameTarget::new(&mut self.color, &mut self.depth, self.width, self.height)
        }

        fn drawn(&self) -> usize {
            self.color.iter().filter(|&&c| c != 0).count()
        }
    }

    #[test]
    fn triangle_fills_interior_pixels() {
        let mut frame = Frame::new(64, 64);
        let rect = PixelRect::full(64, 64);
        draw_triangle(
            &mut frame.target(),
            &rect,
            Vec3::new(10.0, 10.0, 0.5),
            Vec3::new(50.0, 12.0, 0.5),
            Vec3::new(30.0, 50.0, 0.5),
            0xFFFFFFFF,
        );
        let drawn = frame.drawn();
        assert!(drawn > 300, "expected a filled triangle, got {} pixels", drawn);
        // Centroid must be covered.
        assert_ne!(frame.color[24 * 64 + 30], 0);
    }

    #[test]
    fn zero_height_triangle_draws_nothing() {
        let mut frame = Frame::new(32, 32);
        let rect = PixelRect::full(32, 32);
        draw_triangle(
            &mut frame.target(),
            &rect,
            Vec3::new(2.0, 10.0, 0.5),
            Vec3::new(20.0, 10.0, 0.5),
            Vec3::new(28.0, 10.0, 0.5),
            0xFFFFFFFF,
        );
        assert_eq!(frame.drawn(), 0, "dy ~ 0 halves must be skipped");
    }

    #[test]
    fn nan_triangle_draws_nothing() {
        let mut frame = Frame::new(32, 32);
        let rect = PixelRect::full(32, 32);
        draw_triangle(
            &mut frame.target(),
            &rect,
            Vec3::new(f32::NAN, 10.0, 0.5),
            Vec3::new(20.0, f32::NAN, 0.5),
            Vec3::new(28.0, 30.0, 0.5),
            0xFFFFFFFF,
        );
        assert_eq!(frame.drawn(), 0);
    }

    #[test]
    fn sub_pixel_triangle_plots_one_pixel() {
        let mut frame = Frame::new(32, 32);
        let rect = PixelRect::full(32, 32);
        draw_triangle(
            &mut frame.target(),
            &rect,
            Vec3::new(5.2, 5.2, 0.5),
            Vec3::new(5.6, 5.3, 0.5),
            Vec3::new(5.4, 5.7, 0.5),
            0xFFFFFFFF,
        );
        assert_eq!(frame.drawn(), 1);
        assert_ne!(frame.color[5 * 32 + 5], 0);
    }

    #[test]
    fn nearer_triangle_occludes_farther_one() {
        let mut frame = Frame::new(64, 64);
        let rect = PixelRect::full(64, 64);
        let near = 0xFFFF0000;
        let far = 0xFF0000FF;

        draw_triangle(
            &mut frame.target(),
            &rect,
            Vec3::new(10.0, 10.0, 0.8),
            Vec3::new(50.0, 10.0, 0.8),
            Vec3::new(30.0, 50.0, 0.8),
            near,
        );
        let depth_before = frame.depth[20 * 64 + 30];
        draw_triangle(
            &mut frame.target(),
            &rect,
            Vec3::new(10.0, 10.0, 0.2),
            Vec3::new(50.0, 10.0, 0.2),
            Vec3::new(30.0, 50.0, 0.2),
            far,
        );

        assert_eq!(
            frame.color[20 * 64 + 30],
            near,
            "farther triangle must not overwrite the nearer one"
        );
        assert_eq!(frame.depth[20 * 64 + 30], depth_before);
    }

    #[test]
    fn spans_respect_tile_bounds() {
        let mut frame = Frame::new(64, 64);
        let rect = PixelRect {
            x0: 16,
            y0: 16,
            x1: 32,
            y1: 32,
        };
        draw_triangle(
            &mut frame.target(),
            &rect,
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(63.0, 0.0, 0.5),
            Vec3::new(32.0, 63.0, 0.5),
            0xFFFFFFFF,
        );
        for y in 0..64 {
            for x in 0..64 {
                if frame.color[y * 64 + x] != 0 {
                    assert!(
                        (16..32).contains(&x) && (16..32).contains(&y),
                        "pixel ({}, {}) written outside the tile rect",
                        x,
                        y
                    );
                }
            }
        }
        assert!(frame.drawn() > 0);
    }

    #[test]
    fn line_interpolates_depth_and_caps_iterations() {
        let mut frame = Frame::new(64, 64);
        draw_line(
            &mut frame.target(),
            Vec3::new(0.0, 32.0, 0.0),
            Vec3::new(63.0, 32.0, 1.0),
            0xFF00FFD2,
            1.0,
        );
        assert_eq!(frame.drawn(), 64);
        let z_start = frame.depth[32 * 64];
        let z_end = frame.depth[32 * 64 + 63];
        assert!(z_end > z_start, "depth must interpolate along the line");

        // Degenerate input must not spin.
        draw_line(
            &mut frame.target(),
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::new(10.0, 10.0, 0.0),
            0xFFFFFFFF,
            1.0,
        );
    }

    #[test]
    fn line_density_dashes() {
        let mut solid = Frame::new(64, 64);
        draw_line(
            &mut solid.target(),
            Vec3::new(0.0, 10.0, 0.5),
            Vec3::new(63.0, 10.0, 0.5),
            0xFFFFFFFF,
            1.0,
        );
        let mut dashed = Frame::new(64, 64);
        draw_line(
            &mut dashed.target(),
            Vec3::new(0.0, 10.0, 0.5),
            Vec3::new(63.0, 10.0, 0.5),
            0xFFFFFFFF,
            0.5,
        );
        assert!(dashed.drawn() < solid.drawn());
        assert!(dashed.drawn() > 0);
    }

    #[test]
    fn clip_accepts_inside_rejects_outside() {
        assert!(clip_line(1.0, 1.0, 30.0, 30.0, 64.0, 64.0).is_some());
        assert!(clip_line(-10.0, -10.0, -1.0, -5.0, 64.0, 64.0).is_none());
    }

    #[test]
    fn clip_trims_crossing_segment() {
        let (x0, y0, x1, y1) =
            clip_line(-32.0, 32.0, 96.0, 32.0, 64.0, 64.0).expect("segment crosses the viewport");
        assert!(x0 >= 0.0 && x1 <= 63.0);
        assert_eq!(y0, 32.0);
        assert_eq!(y1, 32.0);
    }

    #[test]
    fn points_are_depth_tested_and_flag_gated() {
        let mut frame = Frame::new(32, 32);
        let screen = [
            10.0, 10.0, 0.5, 1.0, // valid
            12.0, 10.0, 0.5, -1.0, // invalid flag
        ];
        draw_points(&mut frame.target(), &screen, 2, 0xFF00FFD2, 1, 1);
        assert_ne!(frame.color[10 * 32 + 10], 0);
        assert_eq!(frame.color[10 * 32 + 12], 0, "invalid vertices are not plotted");
    }
}
