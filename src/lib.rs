pub mod arena;
pub mod camera;
pub mod engine;
/// Raster Engine - frame-oriented CPU rasterization pipeline
/// Built from compartmentalized, individually testable stages
pub mod mesh;
pub mod perf;
pub mod rendering;

pub use arena::{ArenaConfig, FrameArena, Region, RegionId};
pub use camera::{ModelTransform, OrbitCamera};
pub use engine::{DrawMode, FrameEngine, RenderConfig, RevealPhase};
pub use mesh::MeshBuffers;
pub use perf::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};
pub use rendering::depth_sort::{radix_sort_faces, sortable_bits};
pub use rendering::dispatcher::{DispatchMode, DispatcherConfig, TileDispatcher};
pub use rendering::framebuffer::{rgb_to_u32, FAR_DEPTH};
pub use rendering::shading::ShadingConfig;
pub use rendering::tile::{TileBins, TILE_SIZE};
