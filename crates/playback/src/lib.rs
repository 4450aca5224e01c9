//! Playback backend seams: local media transports, remote player control and
//! the inbound remote event stream.

mod error;
mod local;
mod remote;
mod time;
mod wallclock;

pub use error::{PlaybackError, Result};
pub use local::{LocalMedia, LocalTransport};
pub use remote::{
    ChannelRemoteControl, RemoteCommand, RemoteControl, RemoteEvent, RemoteEventInbox,
    RemoteEventSender, RemoteState, remote_event_channel,
};
pub use time::{format_timestamp, parse_timestamp};
pub use wallclock::{ManualWallclock, SystemWallclock, Wallclock};
