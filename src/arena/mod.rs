/// Frame arena: one allocation carved into named, fixed-capacity numeric
/// regions reused every frame.
///
/// Geometry regions live in a single contiguous block of 4-byte words;
/// pixel regions (color + depth) live in a second block that may grow when
/// the output resolution does. A region's backing can be redirected to an
/// external block (zero-copy interop with a shared heap) without touching
/// the other regions.
///
/// Concurrency contract: blocks are reference-counted and interiorly
/// mutable so tile workers can read geometry and write disjoint pixel
/// rectangles during dispatch. Safety is structural, not locked: the main
/// thread mutates regions only between dispatches, workers only touch
/// their own tile's pixels, and geometry is read-only while any dispatch
/// is in flight.
use std::cell::UnsafeCell;
use std::sync::Arc;

/// Raw word storage shared between the main thread and tile workers.
pub struct HeapBlock {
    words: UnsafeCell<Box<[u32]>>,
}

// Safety: see the module contract. Tiles own disjoint pixel rectangles and
// geometry is not mutated while workers read it; no two parties write the
// same words concurrently.
unsafe impl Send for HeapBlock {}
unsafe impl Sync for HeapBlock {}

impl HeapBlock {
    fn new(len_words: usize) -> Arc<Self> {
        Arc::new(Self {
            words: UnsafeCell::new(vec![0u32; len_words].into_boxed_slice()),
        })
    }

    /// # Safety
    /// Callers must uphold the module's structural aliasing contract.
    #[inline]
    unsafe fn words_mut(&self) -> &mut [u32] {
        &mut *(*self.words.get())
    }
}

/// A typed window into a heap block: `offset`/`len` are in 4-byte words.
#[derive(Clone)]
pub struct Region {
    block: Arc<HeapBlock>,
    offset: usize,
    len: usize,
}

impl Region {
    /// Standalone region with its own backing, used as a redirect target
    /// by collaborators that own an external shared heap.
    pub fn external(len_words: usize) -> Self {
        Self {
            block: HeapBlock::new(len_words),
            offset: 0,
            len: len_words,
        }
    }

    #[inline]
    pub fn len_words(&self) -> usize {
        self.len
    }

    /// Base address of the region, for layout assertions.
    pub fn base_ptr(&self) -> *const u32 {
        unsafe { self.block.words_mut().as_ptr().add(self.offset) }
    }

    /// # Safety
    /// The region must not be concurrently written through another view;
    /// see the module contract.
    #[inline]
    pub unsafe fn as_u32_mut(&self) -> &mut [u32] {
        &mut self.block.words_mut()[self.offset..self.offset + self.len]
    }

    /// # Safety
    /// Same contract as [`Region::as_u32_mut`].
    #[inline]
    pub unsafe fn as_f32_mut(&self) -> &mut [f32] {
        bytemuck::cast_slice_mut(self.as_u32_mut())
    }
}

/// Named arena regions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegionId {
    /// View-space vertices, 4 words each.
    World,
    /// Projected vertices, 4 words each.
    Screen,
    /// Index buffer staging, 3 words per face.
    Indices,
    /// Per-face depth keys (compacted).
    DepthKeys,
    /// Per-face shading intensity (by original face id).
    Intensities,
    /// Compacted face ids, radix-sort primary buffer.
    SortIds,
    /// Radix-sort scratch ids.
    AuxIds,
    /// Radix-sort scratch keys.
    AuxKeys,
    /// Radix histograms, two 16-bit digit rows.
    Histogram,
    /// Packed-pixel color plane.
    Color,
    /// Depth plane.
    Depth,
}

/// Capacity budget fixed at arena construction.
#[derive(Copy, Clone, Debug)]
pub struct ArenaConfig {
    pub max_vertices: usize,
    pub max_faces: usize,
    /// Initial output resolution; pixel regions grow past it on demand.
    pub width: usize,
    pub height: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            max_vertices: 2_000_000,
            max_faces: 1_500_000,
            width: 2560,
            height: 1440,
        }
    }
}

/// All per-frame regions as disjoint typed slices.
pub struct FrameViews<'a> {
    pub world: &'a mut [f32],
    pub screen: &'a mut [f32],
    pub indices: &'a mut [u32],
    pub depth_keys: &'a mut [f32],
    pub intensities: &'a mut [f32],
    pub sort_ids: &'a mut [u32],
    pub aux_ids: &'a mut [u32],
    pub aux_keys: &'a mut [f32],
    pub histogram: &'a mut [u32],
    /// Truncated to the current resolution.
    pub color: &'a mut [u32],
    pub depth: &'a mut [f32],
}

pub struct FrameArena {
    config: ArenaConfig,
    width: usize,
    height: usize,
    pixel_capacity: usize,
    world: Region,
    screen: Region,
    indices: Region,
    depth_keys: Region,
    intensities: Region,
    sort_ids: Region,
    aux_ids: Region,
    aux_keys: Region,
    histogram: Region,
    color: Region,
    depth: Region,
}

impl FrameArena {
    /// Reserve the session's buffers: one geometry block sliced at computed
    /// offsets plus one pixel block sized to the initial resolution.
    pub fn allocate(config: ArenaConfig) -> Self {
        let mv4 = config.max_vertices * 4;
        let mf = config.max_faces;
        let mf3 = config.max_faces * 3;
        let hist = crate::rendering::depth_sort::HISTOGRAM_LEN;

        let sizes = [mv4, mv4, mf3, mf, mf, mf, mf, mf, hist];
        let total: usize = sizes.iter().sum();
        let block = HeapBlock::new(total);

        let mut offset = 0usize;
        let mut carve = |len: usize| {
            let region = Region {
                block: block.clone(),
                offset,
                len,
            };
            offset += len;
            region
        };

        let world = carve(mv4);
        let screen = carve(mv4);
        let indices = carve(mf3);
        let depth_keys = carve(mf);
        let intensities = carve(mf);
        let sort_ids = carve(mf);
        let aux_ids = carve(mf);
        let aux_keys = carve(mf);
        let histogram = carve(hist);

        let pixel_capacity = config.width * config.height;
        let pixels = HeapBlock::new(pixel_capacity * 2);
        let color = Region {
            block: pixels.clone(),
            offset: 0,
            len: pixel_capacity,
        };
        let depth = Region {
            block: pixels,
            offset: pixel_capacity,
            len: pixel_capacity,
        };

        println!(
            "[ARENA] allocated {} geometry words + {}x{} pixels",
            total, config.width, config.height
        );

        Self {
            config,
            width: config.width,
            height: config.height,
            pixel_capacity,
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
        }
    }

    #[inline]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Shared handle to a region, e.g. for building a dispatch snapshot.
    pub fn region(&self, id: RegionId) -> &Region {
        match id {
            RegionId::World => &self.world,
            RegionId::Screen => &self.screen,
            RegionId::Indices => &self.indices,
            RegionId::DepthKeys => &self.depth_keys,
            RegionId::Intensities => &self.intensities,
            RegionId::SortIds => &self.sort_ids,
            RegionId::AuxIds => &self.aux_ids,
            RegionId::AuxKeys => &self.aux_keys,
            RegionId::Histogram => &self.histogram,
            RegionId::Color => &self.color,
            RegionId::Depth => &self.depth,
        }
    }

    fn region_mut(&mut self, id: RegionId) -> &mut Region {
        match id {
            RegionId::World => &mut self.world,
            RegionId::Screen => &mut self.screen,
            RegionId::Indices => &mut self.indices,
            RegionId::DepthKeys => &mut self.depth_keys,
            RegionId::Intensities => &mut self.intensities,
            RegionId::SortIds => &mut self.sort_ids,
            RegionId::AuxIds => &mut self.aux_ids,
            RegionId::AuxKeys => &mut self.aux_keys,
            RegionId::Histogram => &mut self.histogram,
            RegionId::Color => &mut self.color,
            RegionId::Depth => &mut self.depth,
        }
    }

    /// Swap a region's backing to an external view. Permanent for all
    /// following frames until redirected again; every call site keeps
    /// going through the same region handle, so nothing else changes.
    /// A view smaller than the region's capacity is rejected (logged and
    /// ignored) rather than risking out-of-range frame writes.
    pub fn redirect(&mut self, id: RegionId, view: Region) {
        let region = self.region_mut(id);
        if view.len_words() < region.len {
            println!(
                "[ARENA] redirect of {:?} rejected: view holds {} words, region needs {}",
                id,
                view.len_words(),
                region.len
            );
            return;
        }
        let len = region.len;
        *region = Region { len, ..view };
    }

    /// Grow the pixel regions to cover `width x height`. Growth only: a
    /// request at or below current capacity just records the resolution
    /// (shrinking would invalidate outstanding dispatch snapshots), and
    /// geometry regions never move.
    pub fn ensure_capacity(&mut self, width: usize, height: usize) {
        let required = width * height;
        if required > self.pixel_capacity {
            println!(
                "[ARENA] growing pixel buffers from {} to {} pixels",
                self.pixel_capacity, required
            );
            let pixels = HeapBlock::new(required * 2);
            self.color = Region {
                block: pixels.clone(),
                offset: 0,
                len: required,
            };
            self.depth = Region {
                block: pixels,
                offset: required,
                len: required,
            };
            self.pixel_capacity = required;
        }
        self.width = width;
        self.height = height;
    }

    /// Mutable views over every region for one frame's stages.
    ///
    /// The geometry regions are disjoint windows of one block and the two
    /// pixel regions are disjoint windows of another, so handing out all
    /// the slices at once is sound as long as redirected regions do not
    /// alias each other (the redirect contract).
    pub fn frame_views(&mut self) -> FrameViews<'_> {
        let pixels = self.width * self.height;
        unsafe {
            FrameViews {
                world: self.world.as_f32_mut(),
                screen: self.screen.as_f32_mut(),
                indices: self.indices.as_u32_mut(),
                depth_keys: self.depth_keys.as_f32_mut(),
                intensities: self.intensities.as_f32_mut(),
                sort_ids: self.sort_ids.as_u32_mut(),
                aux_ids: self.aux_ids.as_u32_mut(),
                aux_keys: self.aux_keys.as_f32_mut(),
                histogram: self.histogram.as_u32_mut(),
                color: &mut self.color.as_u32_mut()[..pixels],
                depth: &mut self.depth.as_f32_mut()[..pixels],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ArenaConfig {
        ArenaConfig {
            max_vertices: 64,
            max_faces: 32,
            width: 64,
            height: 64,
        }
    }

    #[test]
    fn regions_are_disjoint_and_sized() {
        let mut arena = FrameArena::allocate(small_config());
        let views = arena.frame_views();
        assert_eq!(views.world.len(), 64 * 4);
        assert_eq!(views.screen.len(), 64 * 4);
        assert_eq!(views.indices.len(), 32 * 3);
        assert_eq!(views.depth_keys.len(), 32);
        assert_eq!(views.color.len(), 64 * 64);
        assert_eq!(views.depth.len(), 64 * 64);

        // Writes through one region must not show up in a neighbor.
        views.world.fill(7.0);
        assert!(views.screen.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn ensure_capacity_grows_but_never_shrinks() {
        let mut arena = FrameArena::allocate(ArenaConfig {
            width: 2560,
            height: 1440,
            ..small_config()
        });
        let world_base = arena.region(RegionId::World).base_ptr();
        let color_base = arena.region(RegionId::Color).base_ptr();

        arena.ensure_capacity(3000, 2000);
        assert_eq!(arena.width(), 3000);
        assert_eq!(arena.height(), 2000);
        assert_eq!(arena.region(RegionId::Color).len_words(), 3000 * 2000);
        assert_ne!(
            arena.region(RegionId::Color).base_ptr(),
            color_base,
            "growing is allowed to move pixel regions"
        );
        assert_eq!(
            arena.region(RegionId::World).base_ptr(),
            world_base,
            "geometry regions must not move on pixel growth"
        );

        // Shrink request: resolution is recorded, capacity is untouched.
        let grown_base = arena.region(RegionId::Color).base_ptr();
        arena.ensure_capacity(640, 480);
        assert_eq!(arena.width(), 640);
        assert_eq!(arena.region(RegionId::Color).len_words(), 3000 * 2000);
        assert_eq!(arena.region(RegionId::Color).base_ptr(), grown_base);
    }

    #[test]
    fn redirect_swaps_backing_without_touching_neighbors() {
        let mut arena = FrameArena::allocate(small_config());
        let screen_len = arena.region(RegionId::Screen).len_words();
        let world_base = arena.region(RegionId::World).base_ptr();

        let external = Region::external(screen_len);
        let external_base = external.base_ptr();
        arena.redirect(RegionId::Screen, external);

        assert_eq!(arena.region(RegionId::Screen).base_ptr(), external_base);
        assert_eq!(arena.region(RegionId::Screen).len_words(), screen_len);
        assert_eq!(arena.region(RegionId::World).base_ptr(), world_base);

        // Frame views now write into the external storage.
        let views = arena.frame_views();
        views.screen[0] = 42.0;
        drop(views);
        let readback = unsafe { arena.region(RegionId::Screen).as_f32_mut()[0] };
        assert_eq!(readback, 42.0);
    }

    #[test]
    fn undersized_redirect_is_rejected() {
        let mut arena = FrameArena::allocate(small_config());
        let base = arena.region(RegionId::Screen).base_ptr();
        arena.redirect(RegionId::Screen, Region::external(4));
        assert_eq!(
            arena.region(RegionId::Screen).base_ptr(),
            base,
            "undersized view must leave the region untouched"
        );
    }
}
