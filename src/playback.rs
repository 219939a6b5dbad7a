//! Derivation of playback intervals from play/pause/end events.

use crate::{
    config::{PairingPolicy, PlaybackParams},
    error::{Error, Result},
    types::{Event, EventKind, PlayLogEntry, ValidRange},
};
use indexmap::IndexMap;
use itertools::Itertools;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Turns a play log into paired events and paired events into
/// [ValidRange]s.
#[derive(Debug, Clone, Default)]
pub struct RangeExtractor {
    params: PlaybackParams,
}

impl RangeExtractor {
    pub fn new(params: PlaybackParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlaybackParams {
        &self.params
    }

    /// Pairs every retained play with a terminating event. The result
    /// alternates `play, terminator` and both events of a pair share
    /// the same `valid` flag.
    pub fn pair(&self, log: &[PlayLogEntry]) -> Vec<Event> {
        match self.params.policy {
            PairingPolicy::Sequential => self.pair_sequential(log),
            PairingPolicy::LastPlay => self.pair_last_play(log),
        }
    }

    /// Extracts ranges from paired events, failing when none are found.
    pub fn extract(&self, events: &[Event]) -> Result<Vec<ValidRange>> {
        let ranges = extract_ranges(events);
        if ranges.is_empty() {
            return Err(Error::NoValidRanges);
        }
        Ok(ranges)
    }

    fn pair_sequential(&self, log: &[PlayLogEntry]) -> Vec<Event> {
        let last_plays = last_play_positions(log);
        let last_content = last_plays
            .keys()
            .copied()
            .max_by(|lhs, rhs| compare_content_ids(lhs, rhs));

        let mut consumed = vec![false; log.len()];
        let mut events = Vec::with_capacity(log.len() * 2);

        for (idx, play) in log.iter().enumerate() {
            if play.kind != EventKind::Play {
                continue;
            }

            // the nearest unused pause or end of the same content
            let terminator = log
                .iter()
                .enumerate()
                .skip(idx + 1)
                .find(|&(pos, next)| {
                    !consumed[pos]
                        && next.kind.is_terminator()
                        && next.content_id == play.content_id
                });

            let (end, mut kind) = match terminator {
                Some((pos, next)) => {
                    consumed[pos] = true;
                    (next.timestamp, next.kind)
                }
                None => {
                    debug!(
                        "play of content {} at {} is never terminated",
                        play.content_id, play.timestamp
                    );
                    (
                        play.timestamp + self.params.default_play_millis(),
                        EventKind::End,
                    )
                }
            };

            let is_last_play = last_plays.get(play.content_id.as_str()) == Some(&idx);
            let is_last_content = last_content == Some(play.content_id.as_str());
            let valid = match kind {
                EventKind::End => is_last_play,
                EventKind::Pause if is_last_play && is_last_content => {
                    kind = EventKind::End;
                    true
                }
                _ => false,
            };

            events.push(Event {
                timestamp: play.timestamp,
                content_id: play.content_id.clone(),
                kind: EventKind::Play,
                valid,
            });
            events.push(Event {
                timestamp: end,
                content_id: play.content_id.clone(),
                kind,
                valid,
            });
        }

        events
    }

    fn pair_last_play(&self, log: &[PlayLogEntry]) -> Vec<Event> {
        let mut events = Vec::new();

        let last_plays = last_play_positions(log)
            .into_iter()
            .sorted_by(|(lhs, _), (rhs, _)| compare_content_ids(lhs, rhs));

        for (content_id, idx) in last_plays {
            let play = &log[idx];

            // closed by the next play of anything or a pause of itself
            let end = log[idx + 1..]
                .iter()
                .find(|next| {
                    next.kind == EventKind::Play
                        || (next.kind == EventKind::Pause && next.content_id == content_id)
                })
                .map(|next| next.timestamp)
                .unwrap_or_else(|| play.timestamp + self.params.default_play_millis());

            events.push(Event {
                timestamp: play.timestamp,
                content_id: content_id.to_string(),
                kind: EventKind::Play,
                valid: true,
            });
            events.push(Event {
                timestamp: end,
                content_id: content_id.to_string(),
                kind: EventKind::End,
                valid: true,
            });
        }

        events
    }
}

/// Scans paired events and forms a range from every adjacent
/// `(valid play, pause | end)` pair. Anything else advances the scan by
/// one event.
pub fn extract_ranges(events: &[Event]) -> Vec<ValidRange> {
    let mut ranges = Vec::new();
    let mut idx = 0;

    while idx < events.len() {
        let play = &events[idx];

        match events.get(idx + 1) {
            Some(stop)
                if play.kind == EventKind::Play && play.valid && stop.kind.is_terminator() =>
            {
                if stop.timestamp < play.timestamp {
                    warn!(
                        "terminator precedes play for content {} ({} < {}), skipping pair",
                        play.content_id, stop.timestamp, play.timestamp
                    );
                    idx += 1;
                    continue;
                }

                ranges.push(ValidRange {
                    content_id: play.content_id.clone(),
                    start: play.timestamp,
                    end: stop.timestamp,
                });
                idx += 2;
            }
            _ => {
                if play.kind == EventKind::Play && play.valid {
                    debug!(
                        "valid play of content {} has no adjacent terminator",
                        play.content_id
                    );
                }
                idx += 1;
            }
        }
    }

    ranges
}

/// Orders content identifiers numerically where possible. Numeric ids
/// sort before non-numeric ones, which compare as text.
pub fn compare_content_ids(lhs: &str, rhs: &str) -> Ordering {
    match (lhs.trim().parse::<i64>(), rhs.trim().parse::<i64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r).then_with(|| lhs.cmp(rhs)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => lhs.cmp(rhs),
    }
}

/// Position of the last play event of each content item, keyed in
/// order of first appearance.
fn last_play_positions(log: &[PlayLogEntry]) -> IndexMap<&str, usize> {
    let mut positions = IndexMap::new();
    for (idx, entry) in log.iter().enumerate() {
        if entry.kind == EventKind::Play {
            positions.insert(entry.content_id.as_str(), idx);
        }
    }
    positions
}
