use std::fmt::Debug;

use playback::{
    LocalMedia, PlaybackError, RemoteCommand, RemoteControl, RemoteEvent, RemoteEventInbox,
    Wallclock,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::estimator::{PositionEstimate, PositionEstimator};
use crate::time::clamp_to_track;

/// Which kind of playback backend drives a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Local,
    Remote,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Something a clock source observed while processing remote input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockNotice {
    Resynced(PositionEstimate),
    Ready { device_id: String },
    NotReady { device_id: String },
    Failure { message: String },
}

/// Uniform view over a local media element or a remote player.
///
/// Transport calls are fire-and-forget: for a remote source the effect is
/// observed only once the next state event arrives.
pub trait ClockSource: Debug {
    fn kind(&self) -> SourceKind;

    /// Whether reads and marks are meaningful right now.
    fn is_available(&self) -> bool;

    /// Current position, clamped to the known duration. Zero when unavailable.
    fn now_ms(&self) -> i64;

    fn duration_ms(&self) -> Option<i64>;

    fn is_paused(&self) -> bool;

    fn play(&mut self) -> playback::Result<()>;

    fn pause(&mut self) -> playback::Result<()>;

    fn seek(&mut self, t_ms: i64) -> playback::Result<()>;

    /// Applies one event from the remote backend. Local sources ignore them.
    fn handle_remote_event(&mut self, event: RemoteEvent) -> Option<ClockNotice> {
        debug!(source = self.kind().as_str(), ?event, "remote event ignored");
        None
    }

    /// Drains any queued backend input and reports what changed.
    fn poll(&mut self) -> Vec<ClockNotice> {
        Vec::new()
    }

    /// Forgets the current position after a source or track switch.
    fn invalidate(&mut self);
}

/// Clock source over an exact, synchronously readable media element.
#[derive(Debug)]
pub struct LocalClock<M> {
    media: M,
}

impl<M> LocalClock<M>
where
    M: LocalMedia,
{
    pub fn new(media: M) -> Self {
        Self { media }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }
}

impl<M> ClockSource for LocalClock<M>
where
    M: LocalMedia + Debug,
{
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn is_available(&self) -> bool {
        true
    }

    fn now_ms(&self) -> i64 {
        clamp_to_track(self.media.position_ms(), self.media.duration_ms())
    }

    fn duration_ms(&self) -> Option<i64> {
        self.media.duration_ms()
    }

    fn is_paused(&self) -> bool {
        self.media.is_paused()
    }

    fn play(&mut self) -> playback::Result<()> {
        self.media.play();
        Ok(())
    }

    fn pause(&mut self) -> playback::Result<()> {
        self.media.pause();
        Ok(())
    }

    fn seek(&mut self, t_ms: i64) -> playback::Result<()> {
        let target = clamp_to_track(t_ms, self.media.duration_ms());
        self.media.seek(target);
        Ok(())
    }

    fn invalidate(&mut self) {
        self.media.pause();
        self.media.seek(0);
    }
}

/// Clock source over a remote player that reports state as discrete events.
///
/// The source becomes available on `Ready` or on the first state report and
/// unavailable on `NotReady`. Failures leave the last estimate in place.
///
/// # Example
/// ```
/// use cue_engine::{ClockSource, RemoteClock};
/// use playback::{ChannelRemoteControl, ManualWallclock, RemoteEvent, RemoteState};
///
/// let wallclock = ManualWallclock::new(0);
/// let (control, _commands) = ChannelRemoteControl::channel();
/// let mut clock = RemoteClock::new(control, wallclock.clone());
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.handle_remote_event(RemoteEvent::State(RemoteState {
///     position_ms: 8_000,
///     paused: false,
///     duration_ms: Some(90_000),
///     received_at_ms: None,
/// }));
/// wallclock.advance(250);
/// assert_eq!(clock.now_ms(), 8_250);
/// ```
#[derive(Debug)]
pub struct RemoteClock<R, W> {
    control: R,
    estimator: PositionEstimator<W>,
    inbox: Option<RemoteEventInbox>,
    device_id: Option<String>,
    ready: bool,
}

impl<R, W> RemoteClock<R, W>
where
    R: RemoteControl,
    W: Wallclock,
{
    pub fn new(control: R, wallclock: W) -> Self {
        Self {
            control,
            estimator: PositionEstimator::new(wallclock),
            inbox: None,
            device_id: None,
            ready: false,
        }
    }

    /// Attaches the inbox drained on every [`ClockSource::poll`].
    pub fn with_inbox(mut self, inbox: RemoteEventInbox) -> Self {
        self.inbox = Some(inbox);
        self
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn estimate(&self) -> Option<PositionEstimate> {
        self.estimator.estimate()
    }

    fn dispatch(&mut self, command: RemoteCommand) -> playback::Result<()> {
        if !self.ready {
            warn!(command = command.name(), "remote command dropped: device not ready");
            return Err(PlaybackError::DeviceUnavailable {
                device_id: self.device_id.clone(),
            });
        }
        self.control.send(command)
    }
}

impl<R, W> ClockSource for RemoteClock<R, W>
where
    R: RemoteControl + Debug,
    W: Wallclock + Debug,
{
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    fn is_available(&self) -> bool {
        self.ready
    }

    fn now_ms(&self) -> i64 {
        if !self.ready {
            return 0;
        }
        self.estimator.now_ms()
    }

    fn duration_ms(&self) -> Option<i64> {
        self.estimator.duration_ms()
    }

    fn is_paused(&self) -> bool {
        self.estimator.is_paused()
    }

    fn play(&mut self) -> playback::Result<()> {
        self.dispatch(RemoteCommand::Play)
    }

    fn pause(&mut self) -> playback::Result<()> {
        self.dispatch(RemoteCommand::Pause)
    }

    fn seek(&mut self, t_ms: i64) -> playback::Result<()> {
        let t_ms = clamp_to_track(t_ms, self.estimator.duration_ms());
        self.dispatch(RemoteCommand::Seek { t_ms })
    }

    fn handle_remote_event(&mut self, event: RemoteEvent) -> Option<ClockNotice> {
        match event {
            RemoteEvent::State(state) => {
                self.ready = true;
                Some(ClockNotice::Resynced(self.estimator.apply(state)))
            }
            RemoteEvent::Ready { device_id } => {
                info!(device_id = %device_id, "remote device ready");
                self.ready = true;
                self.device_id = Some(device_id.clone());
                Some(ClockNotice::Ready { device_id })
            }
            RemoteEvent::NotReady { device_id } => {
                warn!(device_id = %device_id, "remote device went offline");
                self.ready = false;
                self.estimator.invalidate();
                Some(ClockNotice::NotReady { device_id })
            }
            RemoteEvent::Failure { message } => {
                warn!(%message, "remote playback failure");
                Some(ClockNotice::Failure { message })
            }
        }
    }

    fn poll(&mut self) -> Vec<ClockNotice> {
        let Some(inbox) = self.inbox.as_ref() else {
            return Vec::new();
        };

        match inbox.drain() {
            Ok(events) => events
                .into_iter()
                .filter_map(|event| self.handle_remote_event(event))
                .collect(),
            Err(error) => {
                warn!(%error, "remote event inbox closed");
                self.inbox = None;
                vec![ClockNotice::Failure {
                    message: error.to_string(),
                }]
            }
        }
    }

    fn invalidate(&mut self) {
        self.estimator.invalidate();
    }
}
