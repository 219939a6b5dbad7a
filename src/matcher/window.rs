use super::Claim;
use crate::types::Timestamped;
use std::ops::Range;

/// Index of the first item whose timestamp is not below `target`.
pub fn insertion_point<T>(items: &[T], target: f64) -> usize
where
    T: Timestamped,
{
    items.partition_point(|item| item.timestamp() < target)
}

/// The index range `[center - radius, center + radius)` clipped to
/// `0..len`: `radius` items before `center` and `radius` items from
/// `center` on. Centered on an insertion point, that is the items right
/// below the target and the items at or above it.
pub fn window_around(center: usize, radius: usize, len: usize) -> Range<usize> {
    let start = center.saturating_sub(radius).min(len);
    let end = center.saturating_add(radius).min(len);
    start..end
}

/// Finds the candidate closest to `target` within `max_diff`, scanning
/// in increasing index order. On equal differences the first candidate
/// scanned wins.
pub fn nearest<T, F>(
    items: &[T],
    candidates: Range<usize>,
    target: f64,
    max_diff: f64,
    is_taken: F,
) -> Option<Claim>
where
    T: Timestamped,
    F: Fn(usize) -> bool,
{
    let mut best: Option<Claim> = None;

    for idx in candidates {
        if is_taken(idx) {
            continue;
        }

        let delta = time_diff(items[idx].timestamp(), target);
        if delta > max_diff {
            continue;
        }

        match best {
            Some(current) if current.delta <= delta => {}
            _ => best = Some(Claim { secondary: idx, delta }),
        }
    }

    best
}

pub fn time_diff(lhs: f64, rhs: f64) -> f64 {
    (lhs - rhs).abs()
}
