use crate::{
    config::Columns,
    error::{Error, Result},
    timestamp::parse_millis,
    types::{covering_range, Fields, Frame, ValidRange},
};
use indexmap::IndexMap;
use tracing::{debug, info};

/// A sensor stream as read from its table: a schema and the raw rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTable {
    /// Name used in log lines and errors, usually the source path.
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Fields>,
}

impl FrameTable {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }
}

/// Counts collected while filtering one stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterReport {
    pub total: usize,
    pub retained: usize,
    /// Rows dropped because their timestamp did not parse.
    pub malformed: usize,
    /// Retained frames per content id of the first covering range.
    pub per_content: IndexMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub frames: Vec<Frame>,
    pub report: FilterReport,
}

/// Keeps the frames captured while some content was playing.
#[derive(Debug, Clone)]
pub struct FrameFilter {
    timestamp_column: String,
}

impl FrameFilter {
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into(),
        }
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Retains the rows whose timestamp lies in at least one range and
    /// numbers them densely in their original order.
    ///
    /// Rows with an empty or unparsable timestamp are dropped. A table
    /// without the timestamp column is rejected as a whole.
    pub fn filter(&self, table: &FrameTable, ranges: &[ValidRange]) -> Result<Filtered> {
        if !table.has_column(&self.timestamp_column) {
            return Err(Error::MissingRequiredColumn {
                stream: table.name.clone(),
                column: self.timestamp_column.clone(),
            });
        }

        let mut report = FilterReport {
            total: table.rows.len(),
            ..FilterReport::default()
        };
        let mut frames = Vec::new();

        for row in &table.rows {
            let text = row
                .get(&self.timestamp_column)
                .map(String::as_str)
                .unwrap_or_default();
            let timestamp = match parse_millis(text) {
                Ok(timestamp) => timestamp,
                Err(err) => {
                    debug!("drop a row of {}: {}", table.name, err);
                    report.malformed += 1;
                    continue;
                }
            };

            let Some(range) = covering_range(ranges, timestamp) else {
                continue;
            };
            *report
                .per_content
                .entry(range.content_id.clone())
                .or_default() += 1;

            frames.push(Frame {
                sequence_index: frames.len(),
                timestamp,
                fields: row.clone(),
            });
        }

        report.retained = frames.len();
        info!(
            "{}: kept {} of {} frames ({} malformed), per content {:?}",
            table.name, report.retained, report.total, report.malformed, report.per_content
        );

        Ok(Filtered { frames, report })
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::new(Columns::default().frame_timestamp)
    }
}

/// Sorts frames by timestamp, keeping the relative order of equal
/// timestamps.
pub fn sort_by_timestamp(frames: &mut [Frame]) {
    frames.sort_by(|lhs, rhs| lhs.timestamp.total_cmp(&rhs.timestamp));
}
