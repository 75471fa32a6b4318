/// Performance measurement utilities
/// Each rendering stage is timed and logged for optimization analysis
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        println!("[PERF] {}: {:.2}μs", self.name, elapsed.as_micros());
    }
}

/// Per-frame stage timing accumulator.
#[derive(Default)]
pub struct FrameStats {
    pub transform_us: f64,
    pub visibility_us: f64,
    pub sort_us: f64,
    pub raster_us: f64,
    pub total_us: f64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(&self) {
        println!("\n========== FRAME TIMING SUMMARY ==========");
        println!(
            "Transform/Project: {:8.2}μs ({:5.1}%)",
            self.transform_us,
            (self.transform_us / self.total_us) * 100.0
        );
        println!(
            "Cull/Shade:        {:8.2}μs ({:5.1}%)",
            self.visibility_us,
            (self.visibility_us / self.total_us) * 100.0
        );
        println!(
            "Depth Sort:        {:8.2}μs ({:5.1}%)",
            self.sort_us,
            (self.sort_us / self.total_us) * 100.0
        );
        println!(
            "Rasterization:     {:8.2}μs ({:5.1}%)",
            self.raster_us,
            (self.raster_us / self.total_us) * 100.0
        );
        println!("──────────────────────────────────────────");
        println!("Total:             {:8.2}μs", self.total_us);
        println!("==========================================\n");
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
