/// Integration tests that exercise the full rendering pipeline:
/// mesh buffers -> transform/project -> cull/shade -> sort -> rasterize.
use glam::{Mat4, Vec3};
use raster_engine::arena::ArenaConfig;
use raster_engine::engine::{DrawMode, FrameEngine, RenderConfig, FOCAL_SCALE};
use raster_engine::mesh::{cube, uv_sphere};
use raster_engine::rendering::dispatcher::DispatcherConfig;
use raster_engine::rendering::shading::ShadingConfig;
use raster_engine::rendering::vertex::{project_to_screen, transform_positions};
use raster_engine::rendering::visibility::cull_and_shade;
use raster_engine::{radix_sort_faces, sortable_bits};

fn test_engine(width: usize, height: usize) -> FrameEngine {
    FrameEngine::new(
        ArenaConfig {
            max_vertices: 4096,
            max_faces: 8192,
            width,
            height,
        },
        DispatcherConfig {
            force_sequential: true,
            ..DispatcherConfig::default()
        },
    )
}

/// Push a mesh 5 units in front of the camera, no rotation.
fn front_view() -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0))
}

/// Bounding box of non-transparent pixels: (min_x, min_y, max_x, max_y).
fn drawn_bbox(pixels: &[u32], width: usize, height: usize) -> Option<(usize, usize, usize, usize)> {
    let mut bbox: Option<(usize, usize, usize, usize)> = None;
    for y in 0..height {
        for x in 0..width {
            if pixels[y * width + x] != 0 {
                let b = bbox.get_or_insert((x, y, x, y));
                b.0 = b.0.min(x);
                b.1 = b.1.min(y);
                b.2 = b.2.max(x);
                b.3 = b.3.max(y);
            }
        }
    }
    bbox
}

#[test]
fn unit_cube_produces_twelve_valid_sorted_faces() {
    let mesh = cube();
    let buffers = mesh.buffers();
    let vcount = buffers.vertex_count();

    let mut world = vec![0.0f32; vcount * 4];
    let mut intensities = vec![0.0f32; 16];
    let mut depth_keys = vec![0.0f32; 16];
    let mut sort_ids = vec![0u32; 16];

    transform_positions(&mut world, buffers.positions, &front_view(), vcount);
    let mut screen = world.clone();
    project_to_screen(&mut screen, vcount, 256.0, 256.0, FOCAL_SCALE);

    // Wire rendering keeps back faces, so the whole cube stays valid.
    let valid = cull_and_shade(
        &screen,
        &world,
        buffers.indices,
        vcount,
        &mut intensities,
        &mut depth_keys,
        &mut sort_ids,
        &ShadingConfig::default(),
        true,
    );
    assert_eq!(valid, 12, "every cube face sits in front of the camera");

    let mut aux_ids = vec![0u32; 16];
    let mut aux_keys = vec![0.0f32; 16];
    let mut histogram = vec![0u32; raster_engine::rendering::depth_sort::HISTOGRAM_LEN];
    radix_sort_faces(
        &mut sort_ids[..valid],
        &mut depth_keys[..valid],
        &mut aux_ids,
        &mut aux_keys,
        &mut histogram,
    );

    for pair in depth_keys[..valid].windows(2) {
        assert!(pair[0] <= pair[1], "sorted depth keys must be non-decreasing");
        assert!(sortable_bits(pair[0]) <= sortable_bits(pair[1]));
    }
}

#[test]
fn solid_cube_rasterizes_centered_in_frame() {
    let mut engine = test_engine(256, 256);
    let mesh = cube();
    let config = RenderConfig {
        draw_mode: DrawMode::Solid,
        polygon_color: 0xFFC0C0C0,
        ..RenderConfig::default()
    };

    let rendered = engine.render(&mesh.buffers(), &front_view(), &config, 256, 256);
    assert!(rendered);

    let (pixels, width, height) = engine.frame_pixels();
    let (min_x, min_y, max_x, max_y) =
        drawn_bbox(pixels, width, height).expect("cube must rasterize some pixels");

    let center_x = (min_x + max_x) as f32 / 2.0;
    let center_y = (min_y + max_y) as f32 / 2.0;
    println!(
        "[PIPELINE] cube bbox: ({}, {})..({}, {}), center ({:.1}, {:.1})",
        min_x, min_y, max_x, max_y, center_x, center_y
    );
    assert!(
        (center_x - 128.0).abs() < 4.0 && (center_y - 128.0).abs() < 4.0,
        "cube must land centered in the 256x256 frame"
    );
}

#[test]
fn hidden_face_colors_never_reach_the_frame() {
    // The cube's back faces are farther than its front faces at every
    // covered pixel; with depth sorting plus the per-pixel test, the front
    // face color must win everywhere it overlaps.
    let mut engine = test_engine(256, 256);
    let mesh = cube();
    let config = RenderConfig {
        draw_mode: DrawMode::Solid,
        polygon_color: 0xFFFFFFFF,
        ..RenderConfig::default()
    };
    engine.render(&mesh.buffers(), &front_view(), &config, 256, 256);

    let (pixels, width, _) = engine.frame_pixels();
    // Center pixel shows the +Z face straight on: its normal points at the
    // light's dominant axis, so it takes the brightest shade of the frame.
    let center = pixels[128 * width + 128];
    assert_ne!(center, 0);
    let center_lum = center & 0xFF;
    for &px in pixels.iter().filter(|&&px| px != 0) {
        assert!(
            (px & 0xFF) <= center_lum,
            "no visible pixel may be brighter than the camera-facing face"
        );
    }
}

#[test]
fn wire_mode_draws_edges_without_fill() {
    let mut engine = test_engine(256, 256);
    let mesh = cube();
    let wire_color = 0xFF00FFD2;
    let config = RenderConfig {
        draw_mode: DrawMode::Wire,
        wire_color,
        ..RenderConfig::default()
    };
    engine.render(&mesh.buffers(), &front_view(), &config, 256, 256);

    let (pixels, _, _) = engine.frame_pixels();
    let drawn: Vec<u32> = pixels.iter().copied().filter(|&px| px != 0).collect();
    assert!(!drawn.is_empty(), "wire mode must draw edges");
    assert!(
        drawn.iter().all(|&px| px == wire_color),
        "wire mode draws only the wire color"
    );
    // Edges only: far fewer pixels than the filled projection (~7800).
    assert!(
        drawn.len() < 3000,
        "wire mode should not fill faces, drew {} pixels",
        drawn.len()
    );
}

#[test]
fn shaded_wire_overlays_edges_on_fill() {
    let mut engine = test_engine(256, 256);
    let mesh = cube();
    let wire_color = 0xFF00FFD2;
    let config = RenderConfig {
        draw_mode: DrawMode::ShadedWire,
        polygon_color: 0xFF303030,
        wire_color,
        ..RenderConfig::default()
    };
    engine.render(&mesh.buffers(), &front_view(), &config, 256, 256);

    let (pixels, _, _) = engine.frame_pixels();
    let wire_pixels = pixels.iter().filter(|&&px| px == wire_color).count();
    let fill_pixels = pixels
        .iter()
        .filter(|&&px| px != 0 && px != wire_color)
        .count();
    assert!(wire_pixels > 0, "edges must survive on top of the fill");
    assert!(fill_pixels > 0, "fill must be present under the edges");
}

#[test]
fn points_mode_plots_only_valid_vertices() {
    let mut engine = test_engine(256, 256);
    let mesh = cube();
    let config = RenderConfig {
        draw_mode: DrawMode::Points,
        ..RenderConfig::default()
    };
    engine.render(&mesh.buffers(), &front_view(), &config, 256, 256);

    let (pixels, _, _) = engine.frame_pixels();
    let drawn = pixels.iter().filter(|&&px| px != 0).count();
    // 8 cube corners project to at most 8 distinct pixels.
    assert!(drawn > 0 && drawn <= 8, "expected corner plots, got {}", drawn);
}

#[test]
fn sphere_backfaces_are_culled_in_solid_mode() {
    let mesh = uv_sphere(1.0, 16, 24);
    let buffers = mesh.buffers();
    let vcount = buffers.vertex_count();

    let mut world = vec![0.0f32; vcount * 4];
    let mut intensities = vec![0.0f32; buffers.face_count()];
    let mut depth_keys = vec![0.0f32; buffers.face_count()];
    let mut sort_ids = vec![0u32; buffers.face_count()];

    transform_positions(&mut world, buffers.positions, &front_view(), vcount);
    let mut screen = world.clone();
    project_to_screen(&mut screen, vcount, 256.0, 256.0, FOCAL_SCALE);

    let valid = cull_and_shade(
        &screen,
        &world,
        buffers.indices,
        vcount,
        &mut intensities,
        &mut depth_keys,
        &mut sort_ids,
        &ShadingConfig::default(),
        false,
    );

    assert!(valid > 0, "front hemisphere must survive");
    assert!(
        valid < buffers.face_count(),
        "back hemisphere must be culled ({} of {})",
        valid,
        buffers.face_count()
    );
}

#[test]
fn oversized_mesh_degrades_without_panic() {
    // Arena budget: 16 vertices, 8 faces. The sphere is far bigger.
    let mut engine = FrameEngine::new(
        ArenaConfig {
            max_vertices: 16,
            max_faces: 8,
            width: 128,
            height: 128,
        },
        DispatcherConfig {
            force_sequential: true,
            ..DispatcherConfig::default()
        },
    );
    let mesh = uv_sphere(1.0, 24, 32);
    let rendered = engine.render(
        &mesh.buffers(),
        &front_view(),
        &RenderConfig::default(),
        128,
        128,
    );
    assert!(rendered, "capacity overflow must degrade, not fail the frame");
}

#[test]
fn mesh_behind_camera_renders_empty_frame() {
    let mut engine = test_engine(128, 128);
    let mesh = cube();
    let behind = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
    engine.render(&mesh.buffers(), &behind, &RenderConfig::default(), 128, 128);

    let (pixels, _, _) = engine.frame_pixels();
    assert!(
        pixels.iter().all(|&px| px == 0),
        "geometry behind the camera must not rasterize"
    );
}

#[test]
fn resolution_growth_mid_session_keeps_rendering() {
    let mut engine = test_engine(128, 128);
    let mesh = cube();
    let config = RenderConfig::default();

    assert!(engine.render(&mesh.buffers(), &front_view(), &config, 128, 128));
    // Grow well past the initial pixel capacity.
    assert!(engine.render(&mesh.buffers(), &front_view(), &config, 320, 240));

    let (pixels, width, height) = engine.frame_pixels();
    assert_eq!((width, height), (320, 240));
    assert!(pixels.iter().any(|&px| px != 0));
}
