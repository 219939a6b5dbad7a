use indexmap::IndexMap;
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Gives the millisecond timestamp used to order and compare items
/// across streams.
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

/// Pass-through attributes of a tabular row, in column order.
pub type Fields = IndexMap<String, String>;

/// A sensor frame whose timestamp has been parsed. All other columns
/// are carried in `fields` untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Dense position of the frame within its stream.
    pub sequence_index: usize,
    pub timestamp: f64,
    pub fields: Fields,
}

impl Timestamped for Frame {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// The type of a playback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Play,
    Pause,
    End,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Play => "play",
            EventKind::Pause => "pause",
            EventKind::End => "end",
        }
    }

    /// Pause and end both close a playback interval.
    pub fn is_terminator(&self) -> bool {
        matches!(self, EventKind::Pause | EventKind::End)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event kind {0:?}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let kind = match text.trim().to_ascii_lowercase().as_str() {
            "play" => EventKind::Play,
            "pause" => EventKind::Pause,
            "end" | "stop" => EventKind::End,
            _ => return Err(UnknownEventKind(text.to_string())),
        };
        Ok(kind)
    }
}

/// A row of a raw play log, before pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayLogEntry {
    pub timestamp: f64,
    pub content_id: String,
    pub kind: EventKind,
}

impl Timestamped for PlayLogEntry {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// A paired playback event. The `valid` flag decides whether the pair
/// it belongs to becomes a [ValidRange].
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: f64,
    pub content_id: String,
    pub kind: EventKind,
    pub valid: bool,
}

impl Timestamped for Event {
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// A closed interval `[start, end]` during which a content item was
/// playing.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRange {
    pub content_id: String,
    pub start: f64,
    pub end: f64,
}

impl ValidRange {
    pub fn covers(&self, timestamp: f64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// Returns the first range covering the timestamp. Overlapping ranges
/// are allowed; the earliest one in the slice wins.
pub fn covering_range(ranges: &[ValidRange], timestamp: f64) -> Option<&ValidRange> {
    ranges.iter().find(|range| range.covers(timestamp))
}

/// Time difference of a matched pair, or the absence of a match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchDelta {
    Matched(f64),
    NoMatch,
}

impl MatchDelta {
    pub const NO_MATCH_MARKER: &'static str = "NO_MATCH";

    pub fn millis(&self) -> Option<f64> {
        match *self {
            MatchDelta::Matched(delta) => Some(delta),
            MatchDelta::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchDelta::Matched(_))
    }
}

impl fmt::Display for MatchDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchDelta::Matched(delta) => write!(f, "{delta:.3}"),
            MatchDelta::NoMatch => f.write_str(Self::NO_MATCH_MARKER),
        }
    }
}

/// One output row per primary frame.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRecord {
    pub sequence_index: usize,
    pub primary_timestamp: f64,
    pub primary_fields: Fields,
    /// Position of the claimed frame in the secondary stream.
    pub secondary_index: Option<usize>,
    pub secondary_timestamp: Option<f64>,
    pub secondary_fields: Option<Fields>,
    pub match_delta: MatchDelta,
    pub content_id: Option<String>,
}
