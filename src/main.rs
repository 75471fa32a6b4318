/// Demo viewer entry point.
/// Orbit-drag a primitive mesh rendered by the CPU pipeline.
use glam::Vec3;
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use raster_engine::arena::ArenaConfig;
use raster_engine::camera::{ModelTransform, OrbitCamera};
use raster_engine::engine::{DrawMode, FrameEngine, RenderConfig, RevealPhase};
use raster_engine::mesh::{cube, torus, uv_sphere, MeshData};
use raster_engine::rendering::dispatcher::DispatcherConfig;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::*,
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

fn main() {
    println!("=== Raster Engine - CPU Tile Renderer ===");
    println!("Controls:");
    println!("  Drag      - Orbit");
    println!("  Wheel     - Zoom");
    println!("  1/2/3     - Cube / Sphere / Torus");
    println!("  W/S/E/P   - Wire / Solid / Shaded wire / Points");
    println!("  R         - Toggle auto-rotate");
    println!("  ESC       - Exit");
    println!();

    let event_loop = EventLoop::new().unwrap();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Raster Engine")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
            .build(&event_loop)
            .unwrap(),
    );

    let context = softbuffer::Context::new(window.clone()).unwrap();
    let mut surface = softbuffer::Surface::new(&context, window.clone()).unwrap();

    let mut engine = FrameEngine::new(ArenaConfig::default(), DispatcherConfig::default());
    let mut config = RenderConfig {
        draw_mode: DrawMode::ShadedWire,
        polygon_color: 0xFF474747,
        ..RenderConfig::default()
    };

    let mut camera = OrbitCamera {
        auto_rotate: true,
        ..OrbitCamera::default()
    };
    let model = ModelTransform {
        scale: Vec3::splat(4.0),
        ..ModelTransform::default()
    };

    let meshes: [MeshData; 3] = [cube(), uv_sphere(0.5, 32, 48), torus(0.5, 0.2, 48, 24)];
    let mut mesh_index = 0usize;

    // Mouse state
    let mut dragging = false;
    let mut last_mouse_pos: Option<(f64, f64)> = None;

    // Timing
    let mut frame_count = 0u32;
    let mut fps_timer = Instant::now();
    let mut announced_reveal = false;

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        let pressed = event.state == ElementState::Pressed;
                        if let PhysicalKey::Code(keycode) = event.physical_key {
                            match keycode {
                                KeyCode::Digit1 if pressed => mesh_index = 0,
                                KeyCode::Digit2 if pressed => mesh_index = 1,
                                KeyCode::Digit3 if pressed => mesh_index = 2,
                                KeyCode::KeyW if pressed => config.draw_mode = DrawMode::Wire,
                                KeyCode::KeyS if pressed => config.draw_mode = DrawMode::Solid,
                                KeyCode::KeyE if pressed => {
                                    config.draw_mode = DrawMode::ShadedWire
                                }
                                KeyCode::KeyP if pressed => config.draw_mode = DrawMode::Points,
                                KeyCode::KeyR if pressed => {
                                    camera.auto_rotate = !camera.auto_rotate;
                                    println!(
                                        "Auto-rotate: {}",
                                        if camera.auto_rotate { "ON" } else { "OFF" }
                                    );
                                }
                                KeyCode::Escape if pressed => {
                                    elwt.exit();
                                }
                                _ => {}
                            }
                        }
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            dragging = state == ElementState::Pressed;
                            if !dragging {
                                last_mouse_pos = None;
                            }
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                        };
                        camera.zoom_by(-scroll);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if dragging {
                            if let Some((lx, ly)) = last_mouse_pos {
                                let dx = (position.x - lx) as f32;
                                let dy = (position.y - ly) as f32;
                                camera.orbit(dx * 0.01, dy * 0.01);
                            }
                            last_mouse_pos = Some((position.x, position.y));
                        } else {
                            last_mouse_pos = None;
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let size = window.inner_size();
                        let width = size.width as usize;
                        let height = size.height as usize;
                        if width == 0 || height == 0 {
                            return;
                        }

                        camera.tick();
                        let backend_ready = engine.backend_ready();
                        engine.advance_reveal(backend_ready);
                        if !announced_reveal && engine.reveal_phase() == RevealPhase::Revealed {
                            announced_reveal = true;
                            println!("[FRAME] reveal complete ({:?})", engine.dispatch_mode());
                        }

                        let mesh = meshes[mesh_index].buffers();
                        let view_model = model.view_model(&camera);
                        engine.render(&mesh, &view_model, &config, width, height);

                        // Copy the frame to the window, compositing the
                        // background under transparent pixels.
                        surface
                            .resize(
                                NonZeroU32::new(width as u32).unwrap(),
                                NonZeroU32::new(height as u32).unwrap(),
                            )
                            .unwrap();
                        let (pixels, _, _) = engine.frame_pixels();
                        let mut buffer = surface.buffer_mut().unwrap();
                        for (dst, &src) in buffer.iter_mut().zip(pixels.iter()) {
                            *dst = if src >> 24 == 0 {
                                config.background_color
                            } else {
                                src
                            };
                        }
                        buffer.present().unwrap();

                        frame_count += 1;
                        if fps_timer.elapsed().as_secs() >= 1 {
                            println!(
                                "FPS: {} | Faces: {} | Mode: {:?}",
                                frame_count,
                                mesh.face_count(),
                                config.draw_mode
                            );
                            frame_count = 0;
                            fps_timer = Instant::now();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    window.request_redraw();
                }
                _ => {}
            }
        })
        .unwrap();
}
