/// Frame orchestration.
///
/// One `render` call runs the whole pipeline for a single image:
/// clear -> transform -> project -> cull/shade -> depth sort -> tile
/// dispatch -> wire/point overlays. At most one frame executes at a time;
/// a request arriving while one is in flight is dropped for that tick
/// rather than queued.
use crate::arena::{ArenaConfig, FrameArena, FrameViews, RegionId};
use crate::count_add;
use crate::mesh::MeshBuffers;
#[allow(unused_imports)]
use crate::perf::FUNCTION_COUNTERS;
use crate::rendering::depth_sort::radix_sort_faces;
use crate::rendering::dispatcher::{DispatcherConfig, SharedFrame, TileDispatcher, TileParams};
use crate::rendering::framebuffer::FrameTarget;
use crate::rendering::scanline::{clip_line, draw_line, draw_points};
use crate::rendering::shading::ShadingConfig;
use crate::rendering::tile::TileBins;
use crate::rendering::vertex::{project_to_screen, transform_positions};
use crate::rendering::visibility::cull_and_shade;
use glam::{Mat4, Vec3};
use std::sync::Arc;
use std::time::Instant;

/// Pixel scale of the projection at field_of_view = 1.0.
pub const FOCAL_SCALE: f32 = 400.0;

/// Reveal progress added per tick while shrinking.
const REVEAL_STEP: f32 = 0.05;

/// How the mesh is drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// Unculled dashed edges only.
    Wire,
    /// Depth-sorted flat-shaded fill.
    Solid,
    /// Fill plus wire overlay.
    ShadedWire,
    /// Depth-tested vertex plot.
    Points,
}

/// Per-frame render settings, owned by the caller.
#[derive(Copy, Clone, Debug)]
pub struct RenderConfig {
    pub draw_mode: DrawMode,
    pub polygon_color: u32,
    pub wire_color: u32,
    pub line_thickness: f32,
    /// Lit fraction of the wire dash pattern, 0..=1.
    pub wire_density: f32,
    /// Composited under transparent pixels by the presenter.
    pub background_color: u32,
    pub field_of_view: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            draw_mode: DrawMode::Solid,
            polygon_color: 0xFF1A1A1A,
            wire_color: 0xFF00FFD2,
            line_thickness: 1.0,
            wire_density: 1.0,
            background_color: 0xFF0A0A0A,
            field_of_view: 1.0,
        }
    }
}

/// Loading/reveal phases of the startup overlay.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealPhase {
    Spinning,
    Shrinking,
    Revealed,
}

pub struct FrameEngine {
    arena: FrameArena,
    dispatcher: TileDispatcher,
    bins: Arc<TileBins>,
    shading: ShadingConfig,
    in_flight: bool,
    reveal: RevealPhase,
    reveal_progress: f32,
}

impl FrameEngine {
    pub fn new(arena_config: ArenaConfig, dispatcher_config: DispatcherConfig) -> Self {
        let arena = FrameArena::allocate(arena_config);
        let bins = Arc::new(TileBins::new(arena.width(), arena.height()));
        Self {
            arena,
            dispatcher: TileDispatcher::new(dispatcher_config),
            bins,
            shading: ShadingConfig::default(),
            in_flight: false,
            reveal: RevealPhase::Spinning,
            reveal_progress: 0.0,
        }
    }

    pub fn arena(&self) -> &FrameArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut FrameArena {
        &mut self.arena
    }

    pub fn shading_mut(&mut self) -> &mut ShadingConfig {
        &mut self.shading
    }

    /// Readiness signal of the tile backend, gating the reveal.
    pub fn backend_ready(&self) -> bool {
        self.dispatcher.is_ready()
    }

    pub fn dispatch_mode(&self) -> crate::rendering::dispatcher::DispatchMode {
        self.dispatcher.mode()
    }

    /// Render one frame into the arena's pixel regions.
    ///
    /// Returns false when the request is dropped: zero-sized output, or a
    /// frame already in flight (the single-flight guarantee).
    pub fn render(
        &mut self,
        mesh: &MeshBuffers<'_>,
        view_model: &Mat4,
        config: &RenderConfig,
        width: usize,
        height: usize,
    ) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if self.in_flight {
            count_add!(FUNCTION_COUNTERS.frames_dropped, 1);
            return false;
        }
        self.in_flight = true;
        let frame_start = Instant::now();

        self.arena.ensure_capacity(width, height);
        let max_vertices = self.arena.config().max_vertices;
        let max_faces = self.arena.config().max_faces;
        let vertex_count = mesh.vertex_count().min(max_vertices);
        let face_count = mesh.face_count().min(max_faces);
        let focal = config.field_of_view * FOCAL_SCALE;

        let solid = matches!(config.draw_mode, DrawMode::Solid | DrawMode::ShadedWire);
        let wire = matches!(config.draw_mode, DrawMode::Wire | DrawMode::ShadedWire);
        // Only the pure wire mode draws back faces.
        let unculled = config.draw_mode == DrawMode::Wire;

        let mut valid_count = 0usize;
        {
            let FrameViews {
                world,
                screen,
                indices,
                depth_keys,
                intensities,
                sort_ids,
                aux_ids,
                aux_keys,
                histogram,
                color,
                depth,
            } = self.arena.frame_views();

            let mut target = FrameTarget::new(color, depth, width, height);
            target.clear();

            transform_positions(world, mesh.positions, view_model, vertex_count);
            screen[..vertex_count * 4].copy_from_slice(&world[..vertex_count * 4]);
            project_to_screen(screen, vertex_count, width as f32, height as f32, focal);

            let indices = &mut indices[..face_count * 3];
            indices.copy_from_slice(&mesh.indices[..face_count * 3]);

            if config.draw_mode == DrawMode::Points {
                let size = config.line_thickness.max(1.0) as usize;
                draw_points(&mut target, screen, vertex_count, config.wire_color, size, 1);
            } else {
                valid_count = cull_and_shade(
                    screen,
                    world,
                    indices,
                    vertex_count,
                    intensities,
                    depth_keys,
                    sort_ids,
                    &self.shading,
                    unculled,
                );

                radix_sort_faces(
                    &mut sort_ids[..valid_count],
                    &mut depth_keys[..valid_count],
                    aux_ids,
                    aux_keys,
                    histogram,
                );

                if solid && valid_count > 0 {
                    let bins = Arc::make_mut(&mut self.bins);
                    bins.reset(width, height);
                    bins.bin_faces(screen, indices, &sort_ids[..valid_count]);
                }
            }
        }

        if solid && valid_count > 0 {
            let shared = SharedFrame::snapshot(&self.arena);
            self.dispatcher.render_frame(
                &shared,
                &self.bins,
                TileParams {
                    base_color: config.polygon_color,
                },
            );
        }

        if wire && valid_count > 0 {
            let FrameViews {
                screen,
                indices,
                sort_ids,
                color,
                depth,
                ..
            } = self.arena.frame_views();
            let mut target = FrameTarget::new(color, depth, width, height);
            draw_wireframe(
                &mut target,
                screen,
                &indices[..face_count * 3],
                &sort_ids[..valid_count],
                config.wire_color,
                config.wire_density,
            );
        }

        count_add!(FUNCTION_COUNTERS.frames_rendered, 1);
        let frame_time = frame_start.elapsed();
        if frame_time.as_millis() > 16 {
            println!("[FRAME] frame time: {:.2}ms (> 16ms)", frame_time.as_secs_f64() * 1e3);
        }

        self.in_flight = false;
        true
    }

    /// The finished frame's packed pixels at the current resolution.
    /// Valid between a completed `render` and the next one.
    pub fn frame_pixels(&self) -> (&[u32], usize, usize) {
        let width = self.arena.width();
        let height = self.arena.height();
        // Safety: dispatch fan-in completed; nothing writes pixels between
        // frames (arena contract).
        let pixels = unsafe {
            &self.arena.region(RegionId::Color).as_u32_mut()[..width * height]
        };
        (pixels, width, height)
    }

    /// Advance the loading overlay once per tick. The spinning phase holds
    /// until the external readiness signal is up; the shrink then runs on
    /// a fixed increment.
    pub fn advance_reveal(&mut self, backend_ready: bool) {
        match self.reveal {
            RevealPhase::Spinning => {
                if backend_ready {
                    self.reveal = RevealPhase::Shrinking;
                    self.reveal_progress = 0.0;
                }
            }
            RevealPhase::Shrinking => {
                self.reveal_progress += REVEAL_STEP;
                if self.reveal_progress >= 1.0 {
                    self.reveal_progress = 1.0;
                    self.reveal = RevealPhase::Revealed;
                }
            }
            RevealPhase::Revealed => {}
        }
    }

    pub fn reveal_phase(&self) -> RevealPhase {
        self.reveal
    }

    /// Shrink progress in [0, 1].
    pub fn reveal_progress(&self) -> f32 {
        self.reveal_progress
    }
}

/// Draw the sorted faces' edges through the clipper and the dashed,
/// depth-biased line rasterizer.
fn draw_wireframe(
    target: &mut FrameTarget<'_>,
    screen: &[f32],
    indices: &[u32],
    sorted_ids: &[u32],
    color: u32,
    density: f32,
) {
    let width = target.width as f32;
    let height = target.height as f32;

    for &face in sorted_ids {
        let i3 = face as usize * 3;
        let corners = [
            indices[i3] as usize * 4,
            indices[i3 + 1] as usize * 4,
            indices[i3 + 2] as usize * 4,
        ];
        for edge in 0..3 {
            let a = corners[edge];
            let b = corners[(edge + 1) % 3];
            let (x0, y0, z0) = (screen[a], screen[a + 1], screen[a + 2]);
            let (x1, y1, z1) = (screen[b], screen[b + 1], screen[b + 2]);

            if let Some((cx0, cy0, cx1, cy1)) = clip_line(x0, y0, x1, y1, width, height) {
                draw_line(
                    target,
                    Vec3::new(cx0, cy0, z0),
                    Vec3::new(cx1, cy1, z1),
                    color,
                    density,
                );
            }
        }
    }
}
