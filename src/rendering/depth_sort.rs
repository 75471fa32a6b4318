/// Linear-time depth ordering for the visible face set.
///
/// Depth keys are IEEE-754 floats; their bit patterns are mapped through a
/// monotonic transform so unsigned integer order matches float order, then
/// (key, id) pairs go through a least-significant-digit radix sort in two
/// 16-bit passes.
use crate::count_add;
#[allow(unused_imports)]
use crate::perf::FUNCTION_COUNTERS;

/// Buckets per 16-bit digit.
pub const RADIX_BUCKETS: usize = 1 << 16;
/// Histogram table length: one bucket row per pass.
pub const HISTOGRAM_LEN: usize = RADIX_BUCKETS * 2;

/// Reinterpret a float's bits as an order-preserving unsigned integer.
///
/// Contract: for all finite (and infinite) `a`, `b`:
/// `a < b  <=>  sortable_bits(a) < sortable_bits(b)`.
/// Negative values have every bit flipped, non-negative values only the
/// sign bit, so the whole real line maps monotonically onto `u32`.
#[inline]
pub fn sortable_bits(key: f32) -> u32 {
    let bits = key.to_bits();
    bits ^ ((((bits as i32) >> 31) as u32) | 0x8000_0000)
}

/// Sort `ids` ascending by their parallel `keys` in O(n).
///
/// `aux_ids`/`aux_keys` are scratch buffers at least as long as the input;
/// `histogram` must hold `HISTOGRAM_LEN` entries. Both digit histograms are
/// filled in one pre-pass, then the pairs are scattered low-16 into the aux
/// buffers and high-16 back into the originals, so after the (even) pass
/// count the result is in `ids`/`keys`. Stable within each digit.
pub fn radix_sort_faces(
    ids: &mut [u32],
    keys: &mut [f32],
    aux_ids: &mut [u32],
    aux_keys: &mut [f32],
    histogram: &mut [u32],
) {
    let count = ids.len();
    debug_assert_eq!(keys.len(), count);
    debug_assert!(aux_ids.len() >= count && aux_keys.len() >= count);
    debug_assert!(histogram.len() >= HISTOGRAM_LEN);

    if count <= 1 {
        return;
    }

    count_add!(FUNCTION_COUNTERS.radix_sort_calls, 1);

    let histogram = &mut histogram[..HISTOGRAM_LEN];
    histogram.fill(0);

    // Single pre-pass fills the digit tables for both passes.
    for &key in keys.iter() {
        let s = sortable_bits(key);
        histogram[(s & 0xFFFF) as usize] += 1;
        histogram[RADIX_BUCKETS + (s >> 16) as usize] += 1;
    }

    // Exclusive prefix sums turn counts into scatter offsets.
    for pass in 0..2 {
        let row = &mut histogram[pass * RADIX_BUCKETS..(pass + 1) * RADIX_BUCKETS];
        let mut total = 0u32;
        for slot in row.iter_mut() {
            let c = *slot;
            *slot = total;
            total += c;
        }
    }

    // Pass 1: low 16 bits, primary -> aux.
    for i in 0..count {
        let key = keys[i];
        let bucket = (sortable_bits(key) & 0xFFFF) as usize;
        let dest = histogram[bucket] as usize;
        histogram[bucket] += 1;
        aux_keys[dest] = key;
        aux_ids[dest] = ids[i];
    }

    // Pass 2: high 16 bits, aux -> primary.
    for i in 0..count {
        let key = aux_keys[i];
        let bucket = RADIX_BUCKETS + (sortable_bits(key) >> 16) as usize;
        let dest = histogram[bucket] as usize;
        histogram[bucket] += 1;
        keys[dest] = key;
        ids[dest] = aux_ids[i];
    }
}
