pub mod config;
mod error;
pub mod filter;
pub mod matcher;
pub mod pipeline;
pub mod playback;
pub mod table;
pub mod timestamp;
mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use filter::{FrameFilter, FrameTable};
pub use matcher::{FrameMatcher, MatchSummary, Matching};
pub use playback::RangeExtractor;
pub use timestamp::TimestampCodec;
pub use types::*;
