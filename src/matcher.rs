mod reconcile;
mod sequential;
mod window;

use crate::{
    config::{MatchMode, MatchingParams},
    error::Result,
    types::{covering_range, Frame, MatchDelta, MatchedRecord, ValidRange},
};
use tracing::debug;

/// A tentative assignment of a secondary frame to a primary frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Claim {
    /// Position of the claimed frame in the secondary stream.
    pub secondary: usize,
    pub delta: f64,
}

/// Output of [FrameMatcher::run].
#[derive(Debug, Clone, PartialEq)]
pub struct Matching {
    pub records: Vec<MatchedRecord>,
    pub summary: MatchSummary,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchSummary {
    pub primary_frames: usize,
    pub secondary_frames: usize,
    pub matched: usize,
    pub unmatched_primary: usize,
    pub unmatched_secondary: usize,
    pub mean_delta_ms: Option<f64>,
}

impl MatchSummary {
    /// Fraction of primary frames that received a secondary frame.
    pub fn match_rate(&self) -> f64 {
        if self.primary_frames == 0 {
            0.0
        } else {
            self.matched as f64 / self.primary_frames as f64
        }
    }
}

/// Pairs every primary frame with at most one secondary frame by
/// timestamp proximity.
///
/// Both streams must be sorted by timestamp. The output has one record
/// per primary frame, in primary order, and no secondary frame is
/// assigned twice.
#[derive(Debug, Clone)]
pub struct FrameMatcher {
    params: MatchingParams,
}

impl FrameMatcher {
    pub fn new(params: MatchingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &MatchingParams {
        &self.params
    }

    pub fn run(&self, primary: &[Frame], secondary: &[Frame], ranges: &[ValidRange]) -> Matching {
        let window = self.params.effective_search_window();
        let max_diff = self.params.max_time_diff_ms;

        let claims = match self.params.mode {
            MatchMode::Sequential => sequential::claim(
                primary,
                secondary,
                window,
                max_diff,
                self.params.rewind_margin,
            ),
            MatchMode::Reconciled => reconcile::claim(primary, secondary, window, max_diff),
        };

        let records: Vec<MatchedRecord> = primary
            .iter()
            .zip(&claims)
            .enumerate()
            .map(|(sequence_index, (frame, claim))| {
                let matched = claim.map(|claim| &secondary[claim.secondary]);

                MatchedRecord {
                    sequence_index,
                    primary_timestamp: frame.timestamp,
                    primary_fields: frame.fields.clone(),
                    secondary_index: claim.map(|claim| claim.secondary),
                    secondary_timestamp: matched.map(|frame| frame.timestamp),
                    secondary_fields: matched.map(|frame| frame.fields.clone()),
                    match_delta: claim.map_or(MatchDelta::NoMatch, |claim| {
                        MatchDelta::Matched(claim.delta)
                    }),
                    content_id: covering_range(ranges, frame.timestamp)
                        .map(|range| range.content_id.clone()),
                }
            })
            .collect();

        let summary = summarize(&records, secondary.len());
        debug!(
            "matched {} of {} primary frames in {:?} mode",
            summary.matched, summary.primary_frames, self.params.mode
        );

        Matching { records, summary }
    }
}

fn summarize(records: &[MatchedRecord], secondary_frames: usize) -> MatchSummary {
    let deltas: Vec<f64> = records
        .iter()
        .filter_map(|record| record.match_delta.millis())
        .collect();
    let matched = deltas.len();
    let mean_delta_ms = (matched > 0).then(|| deltas.iter().sum::<f64>() / matched as f64);

    MatchSummary {
        primary_frames: records.len(),
        secondary_frames,
        matched,
        unmatched_primary: records.len() - matched,
        unmatched_secondary: secondary_frames.saturating_sub(matched),
        mean_delta_ms,
    }
}
