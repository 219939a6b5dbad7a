use super::{
    window::{insertion_point, nearest, window_around},
    Claim,
};
use crate::types::Timestamped;

/// Claims secondary items for primary items in primary order. An item
/// claimed once is never offered to a later primary item, even if the
/// later one is closer to it.
pub fn claim<T>(
    primary: &[T],
    secondary: &[T],
    window: usize,
    max_diff: f64,
    rewind_margin: usize,
) -> Vec<Option<Claim>>
where
    T: Timestamped,
{
    let mut taken = vec![false; secondary.len()];
    let mut hint = 0;
    let mut claims = Vec::with_capacity(primary.len());

    for item in primary {
        let target = item.timestamp();

        // the binary search starts at the hint; the window may reach behind it
        let start = hint.min(secondary.len());
        let point = start + insertion_point(&secondary[start..], target);

        let candidates = window_around(point, window, secondary.len());
        let claim = nearest(secondary, candidates, target, max_diff, |idx| taken[idx]);

        if let Some(claim) = claim {
            taken[claim.secondary] = true;
            hint = claim.secondary.saturating_sub(rewind_margin);
        }
        claims.push(claim);
    }

    claims
}
