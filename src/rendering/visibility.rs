/// Per-face visibility and shading pass.
///
/// Walks the index buffer once, rejecting faces with invalid or
/// out-of-range vertices and (outside wire modes) back faces, computing a
/// flat-shading intensity and a depth key for the survivors, and compacting
/// the surviving face ids into the sort buffers.
use crate::count_add;
#[allow(unused_imports)]
use crate::perf::FUNCTION_COUNTERS;
use crate::rendering::shading::ShadingConfig;
use crate::rendering::vertex::VERTEX_VALID;
use glam::Vec3;

/// Face-count thresholds above which the pass samples every 2nd / 4th face.
/// Keeps multi-million-triangle meshes interactive at the cost of density.
const STRIDE_2_FACES: usize = 50_000;
const STRIDE_4_FACES: usize = 200_000;

/// Pick the adaptive sampling stride for a face count.
#[inline]
pub fn face_stride(face_count: usize) -> usize {
    if face_count > STRIDE_4_FACES {
        4
    } else if face_count > STRIDE_2_FACES {
        2
    } else {
        1
    }
}

/// Cull, shade, and compact the faces of the current frame.
///
/// - `screen`: projected vertices (4 floats each, w = validity flag)
/// - `world`: view-space vertices (4 floats each)
/// - `indices`: 3 vertex ids per face
/// - `intensities`: written per ORIGINAL face id (looked up after sorting)
/// - `depth_keys` / `sort_ids`: written per compacted slot
/// - `unculled`: wire modes draw back faces too
///
/// Returns the valid face count: the active length of `depth_keys` and
/// `sort_ids`. Faces beyond the capacity of the per-face buffers are
/// silently skipped, as are faces with indices outside `vertex_count`.
pub fn cull_and_shade(
    screen: &[f32],
    world: &[f32],
    indices: &[u32],
    vertex_count: usize,
    intensities: &mut [f32],
    depth_keys: &mut [f32],
    sort_ids: &mut [u32],
    shading: &ShadingConfig,
    unculled: bool,
) -> usize {
    let face_count = indices.len() / 3;
    let face_budget = intensities.len().min(depth_keys.len()).min(sort_ids.len());
    let stride = face_stride(face_count);

    count_add!(FUNCTION_COUNTERS.faces_submitted, face_count as u64);

    let mut valid_count = 0usize;

    let mut face = 0usize;
    while face < face_count {
        if face >= face_budget {
            // Arena capacity exceeded: the remainder of the mesh is dropped
            // for this frame rather than written out of range.
            break;
        }

        let i3 = face * 3;
        let i0 = indices[i3] as usize;
        let i1 = indices[i3 + 1] as usize;
        let i2 = indices[i3 + 2] as usize;

        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            face += stride;
            continue;
        }

        let b0 = i0 * 4;
        let b1 = i1 * 4;
        let b2 = i2 * 4;

        // Any vertex behind the camera invalidates the whole face.
        if screen[b0 + 3] != VERTEX_VALID
            || screen[b1 + 3] != VERTEX_VALID
            || screen[b2 + 3] != VERTEX_VALID
        {
            count_add!(FUNCTION_COUNTERS.faces_rejected_invalid, 1);
            face += stride;
            continue;
        }

        let (x0, y0) = (screen[b0], screen[b0 + 1]);
        let (x1, y1) = (screen[b1], screen[b1 + 1]);
        let (x2, y2) = (screen[b2], screen[b2 + 1]);

        // Signed screen-space area; non-negative means back-facing under
        // the engine's winding convention (screen Y grows downward).
        let area = (x1 - x0) * (y2 - y0) - (y1 - y0) * (x2 - x0);
        if !unculled && area >= 0.0 {
            count_add!(FUNCTION_COUNTERS.faces_backface_culled, 1);
            face += stride;
            continue;
        }

        // Flat shading from the view-space face normal.
        let p0 = Vec3::new(world[b0], world[b0 + 1], world[b0 + 2]);
        let p1 = Vec3::new(world[b1], world[b1 + 1], world[b1 + 2]);
        let p2 = Vec3::new(world[b2], world[b2 + 1], world[b2 + 2]);
        let mut normal = (p1 - p0).cross(p2 - p0);
        let len_sq = normal.length_squared();
        if len_sq > 0.0 {
            normal /= len_sq.sqrt();
        }

        intensities[face] = shading.face_intensity(normal);
        depth_keys[valid_count] = (world[b0 + 2] + world[b1 + 2] + world[b2 + 2]) * (1.0 / 3.0);
        sort_ids[valid_count] = face as u32;
        valid_count += 1;

        face += stride;
    }

    count_add!(FUNCTION_COUNTERS.faces_shaded, valid_count as u64);
    valid_count
}
