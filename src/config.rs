use crate::{
    error::{Error, Result},
    timestamp::TimestampCodec,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Zone that ISO-8601 play-log timestamps are converted into.
    pub timezone: Tz,
    pub params: MatchingParams,
    pub playback: PlaybackParams,
    pub columns: Columns,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Seoul,
            params: MatchingParams::default(),
            playback: PlaybackParams::default(),
            columns: Columns::default(),
        }
    }
}

impl Config {
    /// Loads and validates a TOML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::MissingConfig {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.playback.validate()
    }

    pub fn codec(&self) -> TimestampCodec {
        TimestampCodec::new(self.timezone)
    }
}

/// Frame matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Primary frames claim secondary frames in timestamp order; the
    /// first claimant keeps a frame.
    #[default]
    Sequential,
    /// Every primary frame proposes a claim independently, then each
    /// secondary frame keeps only its closest claimant.
    Reconciled,
}

impl MatchMode {
    pub fn default_search_window(&self) -> usize {
        match self {
            MatchMode::Sequential => 100,
            MatchMode::Reconciled => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingParams {
    pub mode: MatchMode,
    /// Closed upper bound on the time difference of a matched pair.
    pub max_time_diff_ms: f64,
    /// Candidates inspected on each side of the insertion point.
    /// Falls back to the mode's default when unset.
    pub search_window: Option<usize>,
    /// How far the sequential search hint steps back from the last
    /// claimed secondary frame.
    pub rewind_margin: usize,
}

impl Default for MatchingParams {
    fn default() -> Self {
        Self {
            mode: MatchMode::default(),
            max_time_diff_ms: 100.0,
            search_window: None,
            rewind_margin: 10,
        }
    }
}

impl MatchingParams {
    pub fn effective_search_window(&self) -> usize {
        self.search_window
            .unwrap_or_else(|| self.mode.default_search_window())
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_time_diff_ms.is_finite() && self.max_time_diff_ms >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "max_time_diff_ms must be a finite non-negative number, got {}",
                self.max_time_diff_ms
            )));
        }
        if self.search_window == Some(0) {
            return Err(Error::InvalidConfig(
                "search_window must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// How play/pause/end events are paired into playback intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Every play is paired with the next pause or end of the same
    /// content; only the last play of a content item yields a valid pair.
    #[default]
    Sequential,
    /// Only the last play of each content item is kept and closed by
    /// the next play of any content or the next pause of its own.
    LastPlay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackParams {
    pub policy: PairingPolicy,
    /// Length assumed for a play event that is never terminated.
    #[serde(with = "humantime_serde")]
    pub default_play_duration: Duration,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            policy: PairingPolicy::default(),
            default_play_duration: Duration::from_secs(30),
        }
    }
}

impl PlaybackParams {
    pub fn default_play_millis(&self) -> f64 {
        self.default_play_duration.as_secs_f64() * 1000.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_play_duration.is_zero() {
            return Err(Error::InvalidConfig(
                "default_play_duration must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Column names of the tables exchanged with other tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Columns {
    pub frame_timestamp: String,
    pub frame_index: String,
    pub log_time: String,
    pub log_content_id: String,
    pub log_kind: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            frame_timestamp: "frame_timestamp".to_string(),
            frame_index: "index".to_string(),
            log_time: "time".to_string(),
            log_content_id: "content_id".to_string(),
            log_kind: "kind".to_string(),
        }
    }
}
