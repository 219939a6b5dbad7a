use clap::{Parser, ValueEnum};
use eyre::{bail, Result, WrapErr};
use playback_frame_synchronizer::{
    config::{Config, MatchMode},
    pipeline::{self, EventSource, RunPaths},
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Parser)]
#[command(version)]
/// Aligns camera and eye-tracker frames captured while a stimulus was playing.
struct Args {
    /// config path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// raw play log with ISO-8601 times
    #[arg(long, conflicts_with = "played")]
    pub play_log: Option<PathBuf>,

    /// already paired playback events
    #[arg(long)]
    pub played: Option<PathBuf>,

    /// frame table driving the output, one record per frame
    #[arg(long)]
    pub primary: PathBuf,

    /// frame table matched against the primary frames
    #[arg(long)]
    pub secondary: PathBuf,

    /// matched output table
    #[arg(long)]
    pub output: PathBuf,

    /// write the paired events here
    #[arg(long)]
    pub played_out: Option<PathBuf>,

    /// write the filtered primary frames here
    #[arg(long)]
    pub filtered_primary_out: Option<PathBuf>,

    /// write the filtered secondary frames here
    #[arg(long)]
    pub filtered_secondary_out: Option<PathBuf>,

    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    #[arg(long)]
    pub max_time_diff_ms: Option<f64>,

    #[arg(long)]
    pub search_window: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Sequential,
    Reconciled,
}

impl From<Mode> for MatchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Sequential => MatchMode::Sequential,
            Mode::Reconciled => MatchMode::Reconciled,
        }
    }
}

#[tokio::main]
pub async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse arguments
    let Args {
        config: config_path,
        play_log,
        played,
        primary,
        secondary,
        output,
        played_out,
        filtered_primary_out,
        filtered_secondary_out,
        mode,
        max_time_diff_ms,
        search_window,
    } = Args::parse();

    // load config
    let mut config = match &config_path {
        Some(path) => Config::from_path(path)
            .wrap_err_with(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(mode) = mode {
        config.params.mode = mode.into();
    }
    if let Some(max_time_diff_ms) = max_time_diff_ms {
        config.params.max_time_diff_ms = max_time_diff_ms;
    }
    if search_window.is_some() {
        config.params.search_window = search_window;
    }
    config.validate().wrap_err("invalid command line overrides")?;

    let events = match (play_log, played) {
        (Some(path), _) => EventSource::PlayLog(path),
        (None, Some(path)) => EventSource::Played(path),
        (None, None) => bail!("either --play-log or --played must be given"),
    };
    let paths = RunPaths {
        events,
        primary,
        secondary,
        matched_out: output,
        played_out,
        filtered_primary_out,
        filtered_secondary_out,
    };

    let summary = pipeline::run(Arc::new(config), paths)
        .await
        .wrap_err("synchronization failed")?;
    info!(
        "done: {} ranges, {} primary and {} secondary frames kept, {} matched",
        summary.ranges.len(),
        summary.primary.retained,
        summary.secondary.retained,
        summary.matching.matched
    );

    Ok(())
}
