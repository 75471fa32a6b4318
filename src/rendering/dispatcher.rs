/// Tile-parallel dispatch.
///
/// The frame's tiles either render sequentially on the calling thread or
/// fan out across a pool of persistent workers sharing the arena. Workers
/// receive only a tile index plus per-call parameters and read geometry
/// straight out of the shared regions; per-tile acknowledgments carry a
/// deadline, and a late tile is simply accepted as-is so the frame always
/// completes. Every failure here degrades silently - a missing parallel
/// capability, a worker that never spawns, or a slow tile costs one
/// frame's visual completeness, never an error.
use crate::arena::{FrameArena, Region, RegionId};
use crate::count_add;
#[allow(unused_imports)]
use crate::perf::FUNCTION_COUNTERS;
use crate::rendering::framebuffer::FrameTarget;
use crate::rendering::scanline;
use crate::rendering::shading::shade_color;
use crate::rendering::tile::TileBins;
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::Vec3;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Snapshot of the shared regions a tile job needs. Clones are cheap
/// (reference-counted blocks), and a redirect or pixel-buffer growth on
/// the arena is picked up by the next frame's snapshot.
#[derive(Clone)]
pub struct SharedFrame {
    pub screen: Region,
    pub indices: Region,
    pub intensities: Region,
    pub color: Region,
    pub depth: Region,
    pub width: usize,
    pub height: usize,
}

impl SharedFrame {
    pub fn snapshot(arena: &FrameArena) -> Self {
        Self {
            screen: arena.region(RegionId::Screen).clone(),
            indices: arena.region(RegionId::Indices).clone(),
            intensities: arena.region(RegionId::Intensities).clone(),
            color: arena.region(RegionId::Color).clone(),
            depth: arena.region(RegionId::Depth).clone(),
            width: arena.width(),
            height: arena.height(),
        }
    }
}

/// Per-dispatch parameters forwarded to every tile job.
#[derive(Copy, Clone, Debug)]
pub struct TileParams {
    /// Unshaded polygon color; each face scales it by its intensity.
    pub base_color: u32,
}

/// Job delivered to a worker. A closed variant set instead of stringly
/// dispatch: the compiler checks exhaustiveness at the worker loop.
enum TileJob {
    Render {
        frame_id: u64,
        tile: usize,
        frame: SharedFrame,
        bins: Arc<TileBins>,
        params: TileParams,
    },
}

enum WorkerReply {
    Ready { worker: usize },
    TileDone { frame_id: u64, tile: usize },
}

/// How the dispatcher executes tiles for the rest of the session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// Every tile renders on the calling thread.
    Sequential,
    /// Tiles round-robin across this many persistent workers.
    Parallel { workers: usize },
}

#[derive(Copy, Clone, Debug)]
pub struct DispatcherConfig {
    /// Worker count; 0 means one per available core.
    pub workers: usize,
    /// Per-tile acknowledgment deadline.
    pub tile_timeout: Duration,
    /// Deadline for the spawn READY handshake.
    pub spawn_timeout: Duration,
    /// Skip the capability probe and stay sequential.
    pub force_sequential: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            tile_timeout: Duration::from_millis(50),
            spawn_timeout: Duration::from_secs(2),
            force_sequential: false,
        }
    }
}

/// Rasterize one tile's binned faces into the shared frame.
///
/// This is the single tile routine used by both execution modes, so the
/// sequential fallback is pixel-identical to the parallel path.
pub fn render_tile(frame: &SharedFrame, bins: &TileBins, params: &TileParams, tile: usize) {
    let faces = bins.faces(tile);
    if faces.is_empty() {
        return;
    }
    let rect = bins.tile_rect(tile);

    // Safety: geometry regions are read-only during dispatch and this
    // tile's pixel rectangle belongs to exactly one job (arena contract).
    unsafe {
        let screen: &[f32] = frame.screen.as_f32_mut();
        let indices: &[u32] = frame.indices.as_u32_mut();
        let intensities: &[f32] = frame.intensities.as_f32_mut();
        let pixels = frame.width * frame.height;
        let color = &mut frame.color.as_u32_mut()[..pixels];
        let depth = &mut frame.depth.as_f32_mut()[..pixels];
        let mut target = FrameTarget::new(color, depth, frame.width, frame.height);

        for &face in faces {
            let i3 = face as usize * 3;
            let b0 = indices[i3] as usize * 4;
            let b1 = indices[i3 + 1] as usize * 4;
            let b2 = indices[i3 + 2] as usize * 4;

            let p0 = Vec3::new(screen[b0], screen[b0 + 1], screen[b0 + 2]);
            let p1 = Vec3::new(screen[b1], screen[b1 + 1], screen[b1 + 2]);
            let p2 = Vec3::new(screen[b2], screen[b2 + 1], screen[b2 + 2]);

            let shaded = shade_color(params.base_color, intensities[face as usize]);
            scanline::draw_triangle(&mut target, &rect, p0, p1, p2, shaded);
        }
    }

    count_add!(FUNCTION_COUNTERS.tiles_rendered, 1);
}

fn worker_loop(index: usize, jobs: Receiver<TileJob>, replies: Sender<WorkerReply>) {
    let _ = replies.send(WorkerReply::Ready { worker: index });
    while let Ok(job) = jobs.recv() {
        match job {
            TileJob::Render {
                frame_id,
                tile,
                frame,
                bins,
                params,
            } => {
                render_tile(&frame, &bins, &params, tile);
                if replies
                    .send(WorkerReply::TileDone { frame_id, tile })
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}

pub struct TileDispatcher {
    mode: DispatchMode,
    workers: Vec<Sender<TileJob>>,
    handles: Vec<JoinHandle<()>>,
    replies: Option<Receiver<WorkerReply>>,
    frame_id: u64,
    config: DispatcherConfig,
}

impl TileDispatcher {
    /// Probe parallel capability and spawn the worker pool. Falling back to
    /// sequential mode is a one-way transition: there is no retry within a
    /// session.
    pub fn new(config: DispatcherConfig) -> Self {
        if config.force_sequential {
            println!("[DISPATCH] sequential mode requested");
            return Self::sequential(config);
        }

        let cores = match thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(err) => {
                println!("[DISPATCH] parallel capability unavailable ({err}); sequential mode");
                return Self::sequential(config);
            }
        };
        let requested = if config.workers == 0 { cores } else { config.workers };

        let (reply_tx, reply_rx) = unbounded();
        let mut senders = Vec::with_capacity(requested);
        let mut handles = Vec::with_capacity(requested);

        for index in 0..requested {
            let (job_tx, job_rx) = unbounded();
            let replies = reply_tx.clone();
            let spawn = thread::Builder::new()
                .name(format!("tile-worker-{index}"))
                .spawn(move || worker_loop(index, job_rx, replies));
            match spawn {
                Ok(handle) => {
                    senders.push(job_tx);
                    handles.push(handle);
                }
                Err(err) => {
                    println!("[DISPATCH] worker {index} failed to spawn: {err}");
                }
            }
        }

        // READY handshake: workers that never report in are abandoned.
        let mut ready: HashSet<usize> = HashSet::new();
        let deadline = Instant::now() + config.spawn_timeout;
        while ready.len() < handles.len() {
            match reply_rx.recv_deadline(deadline) {
                Ok(WorkerReply::Ready { worker }) => {
                    ready.insert(worker);
                }
                Ok(WorkerReply::TileDone { .. }) => {}
                Err(_) => break,
            }
        }

        if ready.len() < senders.len() {
            println!(
                "[DISPATCH] {} of {} workers ready before timeout",
                ready.len(),
                senders.len()
            );
            let mut kept = Vec::new();
            for (index, sender) in senders.into_iter().enumerate() {
                if ready.contains(&index) {
                    kept.push(sender);
                }
            }
            senders = kept;
        }

        if senders.is_empty() {
            println!("[DISPATCH] no workers ready; sequential mode for this session");
            let mut dispatcher = Self::sequential(config);
            dispatcher.handles = handles;
            return dispatcher;
        }

        println!("[DISPATCH] {} tile workers active", senders.len());
        Self {
            mode: DispatchMode::Parallel {
                workers: senders.len(),
            },
            workers: senders,
            handles,
            replies: Some(reply_rx),
            frame_id: 0,
            config,
        }
    }

    fn sequential(config: DispatcherConfig) -> Self {
        Self {
            mode: DispatchMode::Sequential,
            workers: Vec::new(),
            handles: Vec::new(),
            replies: None,
            frame_id: 0,
            config,
        }
    }

    #[inline]
    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Readiness signal for the reveal state machine: the backend (pool or
    /// fallback) is committed once construction finished.
    #[inline]
    pub fn is_ready(&self) -> bool {
        true
    }

    /// Execute every non-empty tile of the frame, returning when all tiles
    /// have been rendered or written off against their deadline.
    pub fn render_frame(&mut self, frame: &SharedFrame, bins: &Arc<TileBins>, params: TileParams) {
        self.frame_id += 1;
        let frame_id = self.frame_id;

        let tiles: Vec<usize> =
            (0..bins.tile_count()).filter(|&t| !bins.faces(t).is_empty()).collect();
        if tiles.is_empty() {
            return;
        }

        match self.mode {
            DispatchMode::Sequential => {
                for &tile in &tiles {
                    render_tile(frame, bins, &params, tile);
                }
            }
            DispatchMode::Parallel { workers } => {
                let mut pending: HashSet<usize> = HashSet::with_capacity(tiles.len());
                for (slot, &tile) in tiles.iter().enumerate() {
                    let job = TileJob::Render {
                        frame_id,
                        tile,
                        frame: frame.clone(),
                        bins: bins.clone(),
                        params,
                    };
                    if self.workers[slot % workers].send(job).is_ok() {
                        pending.insert(tile);
                    } else {
                        // Dead worker: degrade by rendering inline.
                        render_tile(frame, bins, &params, tile);
                    }
                }

                let Some(replies) = self.replies.as_ref() else {
                    return;
                };
                let deadline = Instant::now() + self.config.tile_timeout;
                while !pending.is_empty() {
                    match replies.recv_deadline(deadline) {
                        Ok(WorkerReply::TileDone {
                            frame_id: done_frame,
                            tile,
                        }) if done_frame == frame_id => {
                            pending.remove(&tile);
                        }
                        // Stale acknowledgments from written-off tiles of a
                        // previous frame; ignore.
                        Ok(_) => {}
                        Err(_) => {
                            count_add!(FUNCTION_COUNTERS.tiles_timed_out, pending.len() as u64);
                            println!(
                                "[DISPATCH] {} tile(s) missed the {}ms deadline; accepting frame",
                                pending.len(),
                                self.config.tile_timeout.as_millis()
                            );
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl Drop for TileDispatcher {
    fn drop(&mut self) {
        // Closing the job channels ends the worker loops.
        self.workers.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_sequential_has_no_workers() {
        let dispatcher = TileDispatcher::new(DispatcherConfig {
            force_sequential: true,
            ..DispatcherConfig::default()
        });
        assert_eq!(dispatcher.mode(), DispatchMode::Sequential);
        assert!(dispatcher.is_ready());
    }

    #[test]
    fn pool_spawns_requested_workers() {
        let dispatcher = TileDispatcher::new(DispatcherConfig {
            workers: 2,
            ..DispatcherConfig::default()
        });
        match dispatcher.mode() {
            DispatchMode::Parallel { workers } => assert!(workers >= 1 && workers <= 2),
            DispatchMode::Sequential => {
                // Acceptable degrade on constrained environments.
            }
        }
    }
}
