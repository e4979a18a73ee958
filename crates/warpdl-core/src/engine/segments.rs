//! Segment planning
//!
//! Partitions the resource's byte range into contiguous, non-overlapping
//! segments. The plan is computed once after the probe and never
//! rebalanced during the transfer.

use warpdl_types::Segment;

/// Plan the fetch segments for a resource.
///
/// With range support and a known size, produces `concurrency` segments
/// of `total / concurrency` bytes each, the last absorbing the division
/// remainder so its end is always `total - 1`. Otherwise produces a
/// single segment covering the whole resource, open-ended when the size
/// is unknown; the engine fetches that one with an unranged GET.
pub fn plan_segments(total: Option<u64>, resumable: bool, concurrency: u32) -> Vec<Segment> {
    let total = match total {
        Some(t) if t > 0 && resumable => t,
        Some(t) if t > 0 => return vec![Segment::new(0, 0, t - 1)],
        _ => return vec![Segment::new(0, 0, u64::MAX)],
    };

    let concurrency = concurrency.max(1) as u64;
    let segment_size = total / concurrency;
    if segment_size == 0 {
        // Fewer bytes than segments; a split would produce empty ranges
        return vec![Segment::new(0, 0, total - 1)];
    }

    (0..concurrency)
        .map(|i| {
            let start = i * segment_size;
            let end = if i == concurrency - 1 {
                total - 1
            } else {
                start + segment_size - 1
            };
            Segment::new(i as u32, start, end)
        })
        .collect()
}
