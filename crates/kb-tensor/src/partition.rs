//! Static work partitioning.
//!
//! Rows (or elements) are split into contiguous, non-overlapping ranges. The
//! first `total % workers` workers receive one extra row, so no two ranges
//! differ in length by more than one. Workers past `total` get empty ranges.

use std::ops::Range;

/// Half-open row range owned by `worker` out of `workers`.
///
/// `workers` must be at least 1 and `worker < workers`.
pub fn row_range(total: usize, worker: usize, workers: usize) -> Range<usize> {
    debug_assert!(workers >= 1 && worker < workers);
    let base = total / workers;
    let rem = total % workers;
    let start = worker * base + worker.min(rem);
    let extra = usize::from(worker < rem);
    start..start + base + extra
}

/// All ranges for `workers` workers, in worker-index order.
pub fn partition(total: usize, workers: usize) -> Vec<Range<usize>> {
    (0..workers).map(|w| row_range(total, w, workers)).collect()
}

/// Split `buf` into one exclusive slice per range, each range scaled by
/// `row_len` elements.
///
/// The ranges must be contiguous and start at zero, as produced by
/// `partition`; the returned slices are therefore disjoint.
pub fn split_rows_mut<'a>(
    mut buf: &'a mut [f64],
    ranges: &[Range<usize>],
    row_len: usize,
) -> Vec<&'a mut [f64]> {
    let mut out = Vec::with_capacity(ranges.len());
    for r in ranges {
        let (head, tail) = std::mem::take(&mut buf).split_at_mut(r.len() * row_len);
        out.push(head);
        buf = tail;
    }
    out
}
