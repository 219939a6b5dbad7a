#![allow(dead_code)]

use playback_frame_synchronizer::{Fields, Frame, PlayLogEntry, ValidRange};

pub fn frame(sequence_index: usize, timestamp: f64) -> Frame {
    let mut fields = Fields::new();
    fields.insert("frame_timestamp".to_string(), format!("{timestamp:.14}"));
    fields.insert("tag".to_string(), format!("f{sequence_index}"));

    Frame {
        sequence_index,
        timestamp,
        fields,
    }
}

pub fn frames(timestamps: &[f64]) -> Vec<Frame> {
    timestamps
        .iter()
        .enumerate()
        .map(|(idx, &ts)| frame(idx, ts))
        .collect()
}

pub fn range(content_id: &str, start: f64, end: f64) -> ValidRange {
    ValidRange {
        content_id: content_id.to_string(),
        start,
        end,
    }
}

pub fn log_entry(kind: &str, content_id: &str, timestamp: f64) -> PlayLogEntry {
    PlayLogEntry {
        timestamp,
        content_id: content_id.to_string(),
        kind: kind.parse().unwrap(),
    }
}
