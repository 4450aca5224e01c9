use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::cue::CueId;

/// Result type used by the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors produced by engine commands and timeline operations.
#[derive(Debug)]
pub enum EngineError {
    TrackNotLoaded,
    CueNotFound {
        id: CueId,
    },
    DuplicateCueId {
        id: CueId,
    },
    InvalidDocument {
        reason: String,
    },
    UnsupportedDocumentVersion {
        version: u64,
    },
    DocumentParse(serde_json::Error),
    DocumentIo {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidConfig {
        reason: String,
    },
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    ConfigSerialization {
        path: PathBuf,
        source: serde_json::Error,
    },
    Playback(playback::PlaybackError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrackNotLoaded => write!(f, "no track is loaded"),
            Self::CueNotFound { id } => write!(f, "cue not found: {id}"),
            Self::DuplicateCueId { id } => write!(f, "cue id already exists: {id}"),
            Self::InvalidDocument { reason } => write!(f, "invalid cue document: {reason}"),
            Self::UnsupportedDocumentVersion { version } => {
                write!(f, "unsupported cue document version {version}")
            }
            Self::DocumentParse(source) => write!(f, "cue document is not valid JSON ({source})"),
            Self::DocumentIo {
                context,
                path,
                source,
            } => write!(f, "{context}: {} ({source})", path.display()),
            Self::InvalidConfig { reason } => write!(f, "invalid editor config: {reason}"),
            Self::ConfigIo { path, source } => {
                write!(f, "failed to read editor config: {} ({source})", path.display())
            }
            Self::ConfigSerialization { path, source } => {
                write!(
                    f,
                    "editor config deserialization failed at {} ({source})",
                    path.display()
                )
            }
            Self::Playback(err) => write!(f, "playback error: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DocumentParse(source) => Some(source),
            Self::DocumentIo { source, .. } => Some(source),
            Self::ConfigIo { source, .. } => Some(source),
            Self::ConfigSerialization { source, .. } => Some(source),
            Self::Playback(err) => Some(err),
            _ => None,
        }
    }
}

impl From<playback::PlaybackError> for EngineError {
    fn from(value: playback::PlaybackError) -> Self {
        Self::Playback(value)
    }
}
