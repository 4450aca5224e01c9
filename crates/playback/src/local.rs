use tracing::debug;

use crate::wallclock::Wallclock;

/// A locally addressable media element that reports its exact position on
/// demand.
pub trait LocalMedia {
    /// Current position in milliseconds.
    fn position_ms(&self) -> i64;

    /// Track duration once the media metadata is known.
    fn duration_ms(&self) -> Option<i64>;

    fn is_paused(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    /// Moves the playhead. Out-of-range targets are clamped to the track.
    fn seek(&mut self, t_ms: i64);
}

/// Local transport whose playhead advances with a [`Wallclock`].
///
/// Reaching the end of a known duration behaves like a media element that
/// finished: the position holds at the end and the transport reports paused.
///
/// # Example
/// ```
/// use playback::{LocalMedia, LocalTransport, ManualWallclock};
///
/// let clock = ManualWallclock::new(0);
/// let mut transport = LocalTransport::new(clock.clone(), Some(10_000));
/// transport.seek(2_000);
/// transport.play();
/// clock.advance(500);
/// assert_eq!(transport.position_ms(), 2_500);
/// ```
#[derive(Debug, Clone)]
pub struct LocalTransport<W> {
    wallclock: W,
    duration_ms: Option<i64>,
    anchor_position_ms: i64,
    anchor_wallclock_ms: i64,
    playing: bool,
}

impl<W> LocalTransport<W>
where
    W: Wallclock,
{
    pub fn new(wallclock: W, duration_ms: Option<i64>) -> Self {
        let anchor_wallclock_ms = wallclock.now_ms();
        Self {
            wallclock,
            duration_ms: duration_ms.filter(|duration| *duration > 0),
            anchor_position_ms: 0,
            anchor_wallclock_ms,
            playing: false,
        }
    }

    /// Updates the duration after metadata arrives.
    pub fn set_duration_ms(&mut self, duration_ms: Option<i64>) {
        self.duration_ms = duration_ms.filter(|duration| *duration > 0);
    }

    fn clamp(&self, t_ms: i64) -> i64 {
        match self.duration_ms {
            Some(duration) => t_ms.clamp(0, duration),
            None => t_ms.max(0),
        }
    }

    fn reached_end(&self) -> bool {
        self.duration_ms
            .is_some_and(|duration| self.position_ms() >= duration)
    }

    fn reanchor(&mut self, position_ms: i64) {
        self.anchor_position_ms = self.clamp(position_ms);
        self.anchor_wallclock_ms = self.wallclock.now_ms();
    }
}

impl<W> LocalMedia for LocalTransport<W>
where
    W: Wallclock,
{
    fn position_ms(&self) -> i64 {
        if !self.playing {
            return self.anchor_position_ms;
        }

        let elapsed = (self.wallclock.now_ms() - self.anchor_wallclock_ms).max(0);
        self.clamp(self.anchor_position_ms.saturating_add(elapsed))
    }

    fn duration_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    fn is_paused(&self) -> bool {
        !self.playing || self.reached_end()
    }

    fn play(&mut self) {
        let position = if self.reached_end() {
            0
        } else {
            self.position_ms()
        };
        self.reanchor(position);
        self.playing = true;
        debug!(position_ms = self.anchor_position_ms, "local transport playing");
    }

    fn pause(&mut self) {
        let position = self.position_ms();
        self.reanchor(position);
        self.playing = false;
        debug!(position_ms = self.anchor_position_ms, "local transport paused");
    }

    fn seek(&mut self, t_ms: i64) {
        self.reanchor(t_ms);
        debug!(
            requested_ms = t_ms,
            position_ms = self.anchor_position_ms,
            "local transport seeked"
        );
    }
}
