/// Batch vertex processing: object-space positions through the combined
/// view-model matrix, then perspective division into pixel coordinates.
///
/// Both stages operate on the arena's flat buffers. Layout:
/// - input positions: 3 floats per vertex (x, y, z)
/// - world/screen buffers: 4 floats per vertex (x, y, z, w)
use crate::count_add;
#[allow(unused_imports)]
use crate::perf::FUNCTION_COUNTERS;
use glam::Mat4;

/// View-space Z at or beyond this value means the vertex sits behind (or
/// effectively on) the camera plane and cannot be projected.
pub const NEAR_LIMIT: f32 = -0.01;

/// Validity flag values stored in the projected `w` component. The flag is
/// never anything other than these two values.
pub const VERTEX_VALID: f32 = 1.0;
pub const VERTEX_INVALID: f32 = -1.0;

/// Multiply `count` 3-component positions by a column-major 4x4 matrix,
/// writing homogeneous 4-component output. Pure data flow: no branches on
/// vertex values, no allocation, and `count = 0` performs no writes.
pub fn transform_positions(out: &mut [f32], positions: &[f32], matrix: &Mat4, count: usize) {
    debug_assert!(positions.len() >= count * 3);
    debug_assert!(out.len() >= count * 4);
    count_add!(FUNCTION_COUNTERS.vertices_transformed, count as u64);

    let c0 = matrix.x_axis;
    let c1 = matrix.y_axis;
    let c2 = matrix.z_axis;
    let c3 = matrix.w_axis;

    for i in 0..count {
        let src = i * 3;
        let dst = i * 4;
        let v = c0 * positions[src] + c1 * positions[src + 1] + c2 * positions[src + 2] + c3;
        out[dst] = v.x;
        out[dst + 1] = v.y;
        out[dst + 2] = v.z;
        out[dst + 3] = v.w;
    }
}

/// Perspective-divide `count` view-space entries in place into pixel
/// coordinates: origin at the image center, Y growing downward, depth
/// replaced by `1/-z` so larger values are nearer.
///
/// Entries behind the near limit get `w = VERTEX_INVALID` and their x/y
/// are left undefined. Never reads past `count` entries.
pub fn project_to_screen(screen: &mut [f32], count: usize, width: f32, height: f32, focal_scale: f32) {
    debug_assert!(screen.len() >= count * 4);

    let cx = width * 0.5;
    let cy = height * 0.5;

    for i in 0..count {
        let base = i * 4;
        let z = screen[base + 2];

        if z > NEAR_LIMIT {
            screen[base + 3] = VERTEX_INVALID;
            continue;
        }

        let inv_w = 1.0 / -z;
        let scale = focal_scale * inv_w;
        screen[base] = screen[base] * scale + cx;
        screen[base + 1] = -screen[base + 1] * scale + cy;
        screen[base + 2] = inv_w;
        screen[base + 3] = VERTEX_VALID;
    }
}
