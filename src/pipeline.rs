use crate::{
    config::Config,
    error::{Error, Result},
    filter::{sort_by_timestamp, FilterReport, Filtered, FrameFilter},
    matcher::{FrameMatcher, MatchSummary},
    playback::RangeExtractor,
    table,
    timestamp::TimestampCodec,
    types::{Event, ValidRange},
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

/// Where the playback events come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// A raw play log with ISO-8601 times, paired before use.
    PlayLog(PathBuf),
    /// An events table that was already paired.
    Played(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub events: EventSource,
    pub primary: PathBuf,
    pub secondary: PathBuf,
    pub matched_out: PathBuf,
    pub played_out: Option<PathBuf>,
    pub filtered_primary_out: Option<PathBuf>,
    pub filtered_secondary_out: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ranges: Vec<ValidRange>,
    pub primary: FilterReport,
    pub secondary: FilterReport,
    pub matching: MatchSummary,
}

/// Runs a whole session: events to ranges, ranges to filtered streams,
/// filtered streams to matched records.
///
/// Both streams are read and filtered on blocking tasks in parallel.
/// Every input is loaded and checked before the first output is
/// written.
pub async fn run(config: Arc<Config>, paths: RunPaths) -> Result<RunSummary> {
    config.validate()?;
    let matcher = FrameMatcher::new(config.params.clone())?;
    let extractor = RangeExtractor::new(config.playback.clone());
    let codec = config.codec();

    let events = load_events(&config, &extractor, &paths.events)?;
    let ranges = extractor.extract(&events)?;
    info!("extracted {} valid ranges", ranges.len());
    for range in &ranges {
        info!(
            "content {}: {} ~ {}",
            range.content_id,
            describe(&codec, range.start),
            describe(&codec, range.end)
        );
    }
    let ranges = Arc::new(ranges);

    let (primary, secondary) = futures::try_join!(
        filter_stream(config.clone(), ranges.clone(), paths.primary.clone()),
        filter_stream(config.clone(), ranges.clone(), paths.secondary.clone()),
    )?;
    let (primary_columns, primary) = primary;
    let (secondary_columns, secondary) = secondary;

    if let Some(path) = &paths.played_out {
        table::write_events(path, &events)?;
    }
    if let Some(path) = &paths.filtered_primary_out {
        table::write_frames(
            path,
            &primary.frames,
            &primary_columns,
            &config.columns.frame_index,
        )?;
    }
    if let Some(path) = &paths.filtered_secondary_out {
        table::write_frames(
            path,
            &secondary.frames,
            &secondary_columns,
            &config.columns.frame_index,
        )?;
    }

    let Filtered {
        frames: mut primary_frames,
        report: primary_report,
    } = primary;
    let Filtered {
        frames: mut secondary_frames,
        report: secondary_report,
    } = secondary;
    sort_by_timestamp(&mut primary_frames);
    sort_by_timestamp(&mut secondary_frames);

    let matching = matcher.run(&primary_frames, &secondary_frames, &ranges);
    if matching.records.is_empty() {
        warn!(
            "no primary frame lies in a valid range, {} is not written",
            paths.matched_out.display()
        );
    } else {
        table::write_matched(
            &paths.matched_out,
            &matching.records,
            &primary_columns,
            &secondary_columns,
            &config.columns,
        )?;
        info!("matched data saved to {}", paths.matched_out.display());
    }

    let summary = &matching.summary;
    info!(
        "matched {} of {} primary frames ({:.2}%), {} secondary frames unused",
        summary.matched,
        summary.primary_frames,
        summary.match_rate() * 100.0,
        summary.unmatched_secondary
    );
    if let Some(mean) = summary.mean_delta_ms {
        info!("average time difference: {:.3}ms", mean);
    }

    Ok(RunSummary {
        ranges: Arc::unwrap_or_clone(ranges),
        primary: primary_report,
        secondary: secondary_report,
        matching: matching.summary,
    })
}

fn load_events(
    config: &Config,
    extractor: &RangeExtractor,
    source: &EventSource,
) -> Result<Vec<Event>> {
    match source {
        EventSource::PlayLog(path) => {
            let log = table::read_play_log(path, &config.columns, &config.codec())?;
            info!("{}: {} playback events", path.display(), log.len());
            Ok(extractor.pair(&log))
        }
        EventSource::Played(path) => {
            let events = table::read_events(path)?;
            info!("{}: {} paired events", path.display(), events.len());
            Ok(events)
        }
    }
}

/// Reads one frame table and filters it, returning its schema along
/// with the retained frames.
async fn filter_stream(
    config: Arc<Config>,
    ranges: Arc<Vec<ValidRange>>,
    path: PathBuf,
) -> Result<(Vec<String>, Filtered)> {
    tokio::task::spawn_blocking(move || -> Result<(Vec<String>, Filtered)> {
        let table = table::read_frames(&path)?;
        let filter = FrameFilter::new(config.columns.frame_timestamp.clone());
        let filtered = filter.filter(&table, &ranges)?;
        Ok((table.columns, filtered))
    })
    .await
    .map_err(|err| Error::Task(err.to_string()))?
}

fn describe(codec: &TimestampCodec, millis: f64) -> String {
    match codec.to_local(millis) {
        Some(local) => format!("{:.3} ({})", millis, local.format("%Y-%m-%d %H:%M:%S%.3f %Z")),
        None => format!("{millis:.3}"),
    }
}
