use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use cue_engine::EngineError;
use playback::PlaybackError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub enum CliError {
    Engine(EngineError),
    Playback(PlaybackError),
    InvalidArgument {
        reason: String,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    ReplayLog {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Playback(err) => write!(f, "{err}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::Io { path, source } => write!(f, "failed to read {} ({source})", path.display()),
            Self::ReplayLog { path, line, source } => {
                write!(f, "{}:{line}: invalid replay record ({source})", path.display())
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Playback(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::ReplayLog { source, .. } => Some(source),
            Self::InvalidArgument { .. } => None,
        }
    }
}

impl From<EngineError> for CliError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<PlaybackError> for CliError {
    fn from(value: PlaybackError) -> Self {
        Self::Playback(value)
    }
}
