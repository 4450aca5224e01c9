use std::fmt::{Display, Formatter};

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Error type for playback control and timestamp handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    InvalidTimestamp {
        value: String,
    },
    ControlDisconnected,
    InboxClosed,
    DeviceUnavailable {
        device_id: Option<String>,
    },
}

impl Display for PlaybackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTimestamp { value } => write!(f, "invalid timestamp: {value:?}"),
            Self::ControlDisconnected => write!(f, "remote control channel is disconnected"),
            Self::InboxClosed => write!(f, "remote event stream is closed"),
            Self::DeviceUnavailable { device_id } => match device_id {
                Some(device_id) => write!(f, "playback device {device_id} is unavailable"),
                None => write!(f, "no playback device is available"),
            },
        }
    }
}

impl std::error::Error for PlaybackError {}
