//! Reading and writing the CSV tables exchanged with capture and
//! analysis tools.
//!
//! Missing files and missing required columns are fatal. Individual
//! rows with an unusable timestamp or event kind are skipped.

use crate::{
    config::Columns,
    error::{Error, Result},
    filter::FrameTable,
    timestamp::{format_millis, parse_millis, TimestampCodec},
    types::{Event, EventKind, Fields, Frame, MatchedRecord, PlayLogEntry},
};
use csv::{ReaderBuilder, StringRecord, Trim, Writer, WriterBuilder};
use std::{
    fs::{self, File},
    path::Path,
};
use tracing::{debug, warn};

pub const EVENT_INDEX: &str = "index";
pub const EVENT_TIMESTAMP: &str = "timestamp";
pub const EVENT_CONTENT_ID: &str = "content_id";
pub const EVENT_KIND: &str = "kind";
pub const EVENT_VALID: &str = "valid";

pub const MATCHED_INDEX: &str = "sequence_index";
pub const MATCHED_SECONDARY_TIMESTAMP: &str = "secondary_timestamp";
pub const MATCHED_PRIMARY_TIMESTAMP: &str = "primary_timestamp";
pub const MATCHED_CONTENT_ID: &str = "content_id";
pub const MATCHED_DELTA: &str = "match_delta_ms";

/// Reads a raw play log with ISO-8601 times.
pub fn read_play_log(
    path: &Path,
    columns: &Columns,
    codec: &TimestampCodec,
) -> Result<Vec<PlayLogEntry>> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let time_col = column_position(&headers, path, &columns.log_time)?;
    let content_col = column_position(&headers, path, &columns.log_content_id)?;
    let kind_col = column_position(&headers, path, &columns.log_kind)?;

    let mut entries = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;

        // other player events such as seeks carry no playback boundary
        let Ok(kind) = cell(&record, kind_col).parse::<EventKind>() else {
            debug!("skip row {} of {}: not a playback event", row, path.display());
            continue;
        };
        let timestamp = match codec.parse_iso8601(cell(&record, time_col)) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                warn!("skip row {} of {}: {}", row, path.display(), err);
                continue;
            }
        };

        entries.push(PlayLogEntry {
            timestamp,
            content_id: cell(&record, content_col).trim().to_string(),
            kind,
        });
    }

    Ok(entries)
}

/// Reads a paired events table. Without a `valid` column every event
/// counts as valid.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let timestamp_col = column_position(&headers, path, EVENT_TIMESTAMP)?;
    let content_col = column_position(&headers, path, EVENT_CONTENT_ID)?;
    let kind_col = column_position(&headers, path, EVENT_KIND)?;
    let valid_col = headers.iter().position(|name| name == EVENT_VALID);

    let mut events = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;

        let kind = match cell(&record, kind_col).parse::<EventKind>() {
            Ok(kind) => kind,
            Err(err) => {
                warn!("skip row {} of {}: {}", row, path.display(), err);
                continue;
            }
        };
        let timestamp = match parse_millis(cell(&record, timestamp_col)) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                warn!("skip row {} of {}: {}", row, path.display(), err);
                continue;
            }
        };
        let valid = valid_col.map_or(true, |col| parse_flag(cell(&record, col)));

        events.push(Event {
            timestamp,
            content_id: cell(&record, content_col).trim().to_string(),
            kind,
            valid,
        });
    }

    Ok(events)
}

pub fn write_events(path: &Path, events: &[Event]) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record([
        EVENT_INDEX,
        EVENT_TIMESTAMP,
        EVENT_CONTENT_ID,
        EVENT_KIND,
        EVENT_VALID,
    ])?;

    for (index, event) in events.iter().enumerate() {
        writer.write_record([
            index.to_string(),
            format_millis(event.timestamp),
            event.content_id.clone(),
            event.kind.to_string(),
            event.valid.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Reads a frame table verbatim. Short rows are padded with empty
/// cells.
pub fn read_frames(path: &Path) -> Result<FrameTable> {
    let mut reader = open_reader(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: Fields = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), cell(&record, idx).to_string()))
            .collect();
        rows.push(fields);
    }

    Ok(FrameTable {
        name: path.display().to_string(),
        columns,
        rows,
    })
}

/// Writes frames with the given schema, storing each frame's sequence
/// index in `index_column`. The column is prepended when the schema
/// lacks it.
pub fn write_frames(
    path: &Path,
    frames: &[Frame],
    columns: &[String],
    index_column: &str,
) -> Result<()> {
    let mut header: Vec<&str> = Vec::with_capacity(columns.len() + 1);
    if !columns.iter().any(|name| name == index_column) {
        header.push(index_column);
    }
    header.extend(columns.iter().map(String::as_str));

    let mut writer = create_writer(path)?;
    writer.write_record(&header)?;

    for frame in frames {
        let row = header.iter().map(|&name| {
            if name == index_column {
                frame.sequence_index.to_string()
            } else {
                frame.fields.get(name).cloned().unwrap_or_default()
            }
        });
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes matched records. Payload columns are the stream schemas
/// without their index and timestamp columns; an unmatched record has
/// empty secondary cells.
pub fn write_matched(
    path: &Path,
    records: &[MatchedRecord],
    primary_columns: &[String],
    secondary_columns: &[String],
    columns: &Columns,
) -> Result<()> {
    let payload = |schema: &[String]| -> Vec<String> {
        schema
            .iter()
            .filter(|name| **name != columns.frame_index && **name != columns.frame_timestamp)
            .cloned()
            .collect()
    };
    let primary_payload = payload(primary_columns);
    let secondary_payload = payload(secondary_columns);

    let mut header = vec![
        MATCHED_INDEX.to_string(),
        MATCHED_SECONDARY_TIMESTAMP.to_string(),
    ];
    header.extend(secondary_payload.iter().cloned());
    header.push(MATCHED_PRIMARY_TIMESTAMP.to_string());
    header.extend(primary_payload.iter().cloned());
    header.push(MATCHED_CONTENT_ID.to_string());
    header.push(MATCHED_DELTA.to_string());

    let mut writer = create_writer(path)?;
    writer.write_record(&header)?;

    for record in records {
        let mut row = Vec::with_capacity(header.len());
        row.push(record.sequence_index.to_string());
        row.push(
            record
                .secondary_timestamp
                .map(format_millis)
                .unwrap_or_default(),
        );
        row.extend(secondary_payload.iter().map(|name| {
            record
                .secondary_fields
                .as_ref()
                .and_then(|fields| fields.get(name))
                .cloned()
                .unwrap_or_default()
        }));
        row.push(format_millis(record.primary_timestamp));
        row.extend(
            primary_payload
                .iter()
                .map(|name| record.primary_fields.get(name).cloned().unwrap_or_default()),
        );
        row.push(record.content_id.clone().unwrap_or_default());
        row.push(record.match_delta.to_string());

        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>> {
    if !path.is_file() {
        return Err(Error::MissingInputStream {
            path: path.to_path_buf(),
        });
    }

    let reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_path(path)?;
    Ok(reader)
}

fn create_writer(path: &Path) -> Result<Writer<File>> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let writer = WriterBuilder::new().from_path(path)?;
    Ok(writer)
}

fn column_position(headers: &StringRecord, path: &Path, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name == column)
        .ok_or_else(|| Error::MissingRequiredColumn {
            stream: path.display().to_string(),
            column: column.to_string(),
        })
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or_default()
}

fn parse_flag(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
