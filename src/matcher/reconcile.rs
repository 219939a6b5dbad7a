use super::{
    window::{insertion_point, nearest, window_around},
    Claim,
};
use crate::types::Timestamped;
use tracing::debug;

/// Claims secondary items in two passes.
///
/// First every primary item proposes its nearest secondary item on its
/// own. Then each secondary item keeps the proposal with the smallest
/// difference and the other proposers end up unmatched. On equal
/// differences the later primary item keeps the claim. Losers are not
/// offered their next best candidate.
pub fn claim<T>(primary: &[T], secondary: &[T], window: usize, max_diff: f64) -> Vec<Option<Claim>>
where
    T: Timestamped,
{
    let mut claims: Vec<Option<Claim>> = primary
        .iter()
        .map(|item| {
            let target = item.timestamp();
            let point = insertion_point(secondary, target);
            let candidates = window_around(point, window, secondary.len());
            nearest(secondary, candidates, target, max_diff, |_| false)
        })
        .collect();

    // keep the closest claimant of every secondary item
    let mut winners: Vec<Option<(usize, f64)>> = vec![None; secondary.len()];
    for (idx, claim) in claims.iter().enumerate() {
        let Some(claim) = claim else {
            continue;
        };

        match winners[claim.secondary] {
            Some((_, best)) if best < claim.delta => {}
            _ => winners[claim.secondary] = Some((idx, claim.delta)),
        }
    }

    let mut dropped = 0;
    for (idx, claim) in claims.iter_mut().enumerate() {
        let Some(current) = *claim else {
            continue;
        };

        let is_winner = matches!(winners[current.secondary], Some((winner, _)) if winner == idx);
        if !is_winner {
            *claim = None;
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!("{} conflicting claims were dropped", dropped);
    }

    claims
}
