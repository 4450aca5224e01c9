use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PlaybackError, Result};
use crate::wallclock::Wallclock;

/// Playback state reported by a remote player.
///
/// `received_at_ms` is the local wallclock reading at the moment the report
/// arrived. It is stamped by [`RemoteEventSender`] when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    pub position_ms: i64,
    pub paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at_ms: Option<i64>,
}

impl RemoteState {
    /// Returns the state stamped with `received_at_ms` unless already stamped.
    pub fn stamped(self, received_at_ms: i64) -> Self {
        Self {
            received_at_ms: self.received_at_ms.or(Some(received_at_ms)),
            ..self
        }
    }
}

/// Messages pushed by a remote playback backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteEvent {
    State(RemoteState),
    Ready { device_id: String },
    NotReady { device_id: String },
    Failure { message: String },
}

/// Transport commands sent to a remote player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    Play,
    Pause,
    Seek { t_ms: i64 },
}

impl RemoteCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek { .. } => "seek",
        }
    }
}

/// Fire-and-forget command sink for a remote player.
///
/// A successful `send` only means the request was handed off; the effect is
/// observed later through a [`RemoteEvent::State`].
pub trait RemoteControl {
    fn send(&mut self, command: RemoteCommand) -> Result<()>;
}

/// Remote control that forwards commands to a worker owning the network
/// client.
#[derive(Debug, Clone)]
pub struct ChannelRemoteControl {
    command_tx: Sender<RemoteCommand>,
}

impl ChannelRemoteControl {
    pub fn new(command_tx: Sender<RemoteCommand>) -> Self {
        Self { command_tx }
    }

    /// Creates a control together with the receiver the worker drains.
    pub fn channel() -> (Self, Receiver<RemoteCommand>) {
        let (command_tx, command_rx) = mpsc::channel();
        (Self::new(command_tx), command_rx)
    }
}

impl RemoteControl for ChannelRemoteControl {
    fn send(&mut self, command: RemoteCommand) -> Result<()> {
        debug!(command = command.name(), "remote command dispatched");
        self.command_tx
            .send(command)
            .map_err(|_| PlaybackError::ControlDisconnected)
    }
}

/// Producer half handed to the remote backend callback.
#[derive(Debug, Clone)]
pub struct RemoteEventSender<W> {
    event_tx: Sender<RemoteEvent>,
    wallclock: W,
}

impl<W> RemoteEventSender<W>
where
    W: Wallclock,
{
    /// Queues one event, stamping state reports with the current wallclock.
    pub fn send(&self, event: RemoteEvent) -> Result<()> {
        let event = match event {
            RemoteEvent::State(state) => {
                RemoteEvent::State(state.stamped(self.wallclock.now_ms()))
            }
            other => other,
        };
        self.event_tx
            .send(event)
            .map_err(|_| PlaybackError::InboxClosed)
    }
}

/// Consumer half drained by the session on its own thread.
#[derive(Debug)]
pub struct RemoteEventInbox {
    event_rx: Receiver<RemoteEvent>,
}

impl RemoteEventInbox {
    /// Receives all currently queued events in arrival order without
    /// blocking.
    ///
    /// Events queued before the last sender dropped are still returned; the
    /// error is reported once the queue is empty.
    pub fn drain(&self) -> Result<Vec<RemoteEvent>> {
        let mut events = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return Ok(events),
                Err(TryRecvError::Disconnected) if events.is_empty() => {
                    return Err(PlaybackError::InboxClosed);
                }
                Err(TryRecvError::Disconnected) => return Ok(events),
            }
        }
    }
}

/// Creates a stamped event channel between a backend callback and a session.
///
/// # Example
/// ```
/// use playback::{ManualWallclock, RemoteEvent, RemoteState, remote_event_channel};
///
/// let clock = ManualWallclock::new(40);
/// let (sender, inbox) = remote_event_channel(clock);
/// sender
///     .send(RemoteEvent::State(RemoteState {
///         position_ms: 1_000,
///         paused: false,
///         duration_ms: None,
///         received_at_ms: None,
///     }))
///     .expect("inbox is open");
///
/// let events = inbox.drain().expect("events");
/// let RemoteEvent::State(state) = &events[0] else { panic!("state expected") };
/// assert_eq!(state.received_at_ms, Some(40));
/// ```
pub fn remote_event_channel<W>(wallclock: W) -> (RemoteEventSender<W>, RemoteEventInbox)
where
    W: Wallclock,
{
    let (event_tx, event_rx) = mpsc::channel();
    (
        RemoteEventSender {
            event_tx,
            wallclock,
        },
        RemoteEventInbox { event_rx },
    )
}

#[cfg(test)]
mod tests {
    use super::{RemoteCommand, RemoteEvent, RemoteState};

    #[test]
    fn remote_events_use_snake_case_type_tags() {
        let event: RemoteEvent = serde_json::from_str(
            r#"{"type":"state","position_ms":1200,"paused":true,"duration_ms":180000}"#,
        )
        .expect("state event parses");

        assert_eq!(
            event,
            RemoteEvent::State(RemoteState {
                position_ms: 1_200,
                paused: true,
                duration_ms: Some(180_000),
                received_at_ms: None,
            })
        );

        let ready: RemoteEvent =
            serde_json::from_str(r#"{"type":"not_ready","device_id":"abc"}"#).expect("parses");
        assert_eq!(
            ready,
            RemoteEvent::NotReady {
                device_id: "abc".to_string()
            }
        );
    }

    #[test]
    fn stamping_keeps_existing_receive_time() {
        let state = RemoteState {
            position_ms: 0,
            paused: false,
            duration_ms: None,
            received_at_ms: Some(7),
        };
        assert_eq!(state.stamped(99).received_at_ms, Some(7));
    }

    #[test]
    fn command_names_match_transport_verbs() {
        assert_eq!(RemoteCommand::Seek { t_ms: 5 }.name(), "seek");
        assert_eq!(RemoteCommand::Play.name(), "play");
    }
}
