/// Instrumentation for pipeline analysis.
/// Provides stage call/work counters; zero-cost unless the "profiling"
/// feature is enabled.
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters covering every pipeline stage.
pub struct FunctionCounters {
    // Vertex stage
    pub vertices_transformed: AtomicU64,

    // Visibility stage
    pub faces_submitted: AtomicU64,
    pub faces_rejected_invalid: AtomicU64,
    pub faces_backface_culled: AtomicU64,
    pub faces_shaded: AtomicU64,

    // Sorting
    pub radix_sort_calls: AtomicU64,

    // Rasterization
    pub spans_filled: AtomicU64,
    pub span_pixels_tested: AtomicU64,
    pub lines_drawn: AtomicU64,
    pub points_plotted: AtomicU64,

    // Dispatch
    pub tiles_rendered: AtomicU64,
    pub tiles_timed_out: AtomicU64,

    // Orchestration
    pub framebuffer_clear_calls: AtomicU64,
    pub frames_rendered: AtomicU64,
    pub frames_dropped: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            vertices_transformed: AtomicU64::new(0),
            faces_submitted: AtomicU64::new(0),
            faces_rejected_invalid: AtomicU64::new(0),
            faces_backface_culled: AtomicU64::new(0),
            faces_shaded: AtomicU64::new(0),
            radix_sort_calls: AtomicU64::new(0),
            spans_filled: AtomicU64::new(0),
            span_pixels_tested: AtomicU64::new(0),
            lines_drawn: AtomicU64::new(0),
            points_plotted: AtomicU64::new(0),
            tiles_rendered: AtomicU64::new(0),
            tiles_timed_out: AtomicU64::new(0),
            framebuffer_clear_calls: AtomicU64::new(0),
            frames_rendered: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.vertices_transformed.store(0, Ordering::Relaxed);
        self.faces_submitted.store(0, Ordering::Relaxed);
        self.faces_rejected_invalid.store(0, Ordering::Relaxed);
        self.faces_backface_culled.store(0, Ordering::Relaxed);
        self.faces_shaded.store(0, Ordering::Relaxed);
        self.radix_sort_calls.store(0, Ordering::Relaxed);
        self.spans_filled.store(0, Ordering::Relaxed);
        self.span_pixels_tested.store(0, Ordering::Relaxed);
        self.lines_drawn.store(0, Ordering::Relaxed);
        self.points_plotted.store(0, Ordering::Relaxed);
        self.tiles_rendered.store(0, Ordering::Relaxed);
        self.tiles_timed_out.store(0, Ordering::Relaxed);
        self.framebuffer_clear_calls.store(0, Ordering::Relaxed);
        self.frames_rendered.store(0, Ordering::Relaxed);
        self.frames_dropped.store(0, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            vertices_transformed: self.vertices_transformed.load(Ordering::Relaxed),
            faces_submitted: self.faces_submitted.load(Ordering::Relaxed),
            faces_rejected_invalid: self.faces_rejected_invalid.load(Ordering::Relaxed),
            faces_backface_culled: self.faces_backface_culled.load(Ordering::Relaxed),
            faces_shaded: self.faces_shaded.load(Ordering::Relaxed),
            radix_sort_calls: self.radix_sort_calls.load(Ordering::Relaxed),
            spans_filled: self.spans_filled.load(Ordering::Relaxed),
            span_pixels_tested: self.span_pixels_tested.load(Ordering::Relaxed),
            lines_drawn: self.lines_drawn.load(Ordering::Relaxed),
            points_plotted: self.points_plotted.load(Ordering::Relaxed),
            tiles_rendered: self.tiles_rendered.load(Ordering::Relaxed),
            tiles_timed_out: self.tiles_timed_out.load(Ordering::Relaxed),
            framebuffer_clear_calls: self.framebuffer_clear_calls.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy)]
pub struct CounterSnapshot {
    pub vertices_transformed: u64,
    pub faces_submitted: u64,
    pub faces_rejected_invalid: u64,
    pub faces_backface_culled: u64,
    pub faces_shaded: u64,
    pub radix_sort_calls: u64,
    pub spans_filled: u64,
    pub span_pixels_tested: u64,
    pub lines_drawn: u64,
    pub points_plotted: u64,
    pub tiles_rendered: u64,
    pub tiles_timed_out: u64,
    pub framebuffer_clear_calls: u64,
    pub frames_rendered: u64,
    pub frames_dropped: u64,
}

impl CounterSnapshot {
    /// Print formatted report.
    pub fn print_report(&self) {
        println!("\n=== Pipeline Counters Report ===");
        println!("\nVertex Stage:");
        println!("  vertices transformed:   {:12}", self.vertices_transformed);

        println!("\nVisibility Stage:");
        println!("  faces submitted:        {:12}", self.faces_submitted);
        println!("  rejected (invalid):     {:12}", self.faces_rejected_invalid);
        println!("  backface culled:        {:12}", self.faces_backface_culled);
        println!("  shaded (valid):         {:12}", self.faces_shaded);

        println!("\nRasterization:");
        println!("  radix sort calls:       {:12}", self.radix_sort_calls);
        println!("  spans filled:           {:12}", self.spans_filled);
        println!("  span pixels tested:     {:12}", self.span_pixels_tested);
        println!("  lines drawn:            {:12}", self.lines_drawn);
        println!("  points plotted:         {:12}", self.points_plotted);

        println!("\nDispatch:");
        println!("  tiles rendered:         {:12}", self.tiles_rendered);
        println!("  tiles timed out:        {:12}", self.tiles_timed_out);

        println!("\nFrames:");
        println!("  framebuffer clears:     {:12}", self.framebuffer_clear_calls);
        println!("  frames rendered:        {:12}", self.frames_rendered);
        println!("  frames dropped:         {:12}", self.frames_dropped);
        println!();
    }
}

/// Global counters instance.
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Increment a counter (only when the profiling feature is enabled).
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Add to a counter (only when the profiling feature is enabled).
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
