use playback::{RemoteState, Wallclock};
use tracing::debug;

use crate::time::{clamp_to_track, known_duration};

/// Base of an extrapolated remote position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionEstimate {
    pub base_position_ms: i64,
    pub base_wallclock_ms: i64,
    pub is_paused: bool,
    pub known_duration_ms: Option<i64>,
}

impl PositionEstimate {
    /// Extrapolated position at wallclock reading `wallclock_ms`, clamped to
    /// the known duration.
    pub fn position_at(&self, wallclock_ms: i64) -> i64 {
        let raw = if self.is_paused {
            self.base_position_ms
        } else {
            let elapsed = wallclock_ms.saturating_sub(self.base_wallclock_ms).max(0);
            self.base_position_ms.saturating_add(elapsed)
        };
        clamp_to_track(raw, self.known_duration_ms)
    }

    /// Signed gap between a reported position and this estimate's
    /// extrapolation at `wallclock_ms`.
    pub fn drift_ms(&self, reported_ms: i64, wallclock_ms: i64) -> i64 {
        reported_ms.saturating_sub(self.position_at(wallclock_ms))
    }
}

/// Turns bursty remote state reports into a continuously readable position.
///
/// Every report replaces the base outright; between reports a playing
/// position advances with the wallclock. There is no blending across a
/// correction.
///
/// # Example
/// ```
/// use cue_engine::PositionEstimator;
/// use playback::{ManualWallclock, RemoteState};
///
/// let clock = ManualWallclock::new(0);
/// let mut estimator = PositionEstimator::new(clock.clone());
/// estimator.apply(RemoteState {
///     position_ms: 30_000,
///     paused: false,
///     duration_ms: Some(200_000),
///     received_at_ms: None,
/// });
///
/// clock.advance(1_500);
/// assert_eq!(estimator.now_ms(), 31_500);
/// ```
#[derive(Debug, Clone)]
pub struct PositionEstimator<W> {
    wallclock: W,
    estimate: Option<PositionEstimate>,
}

impl<W> PositionEstimator<W>
where
    W: Wallclock,
{
    pub fn new(wallclock: W) -> Self {
        Self {
            wallclock,
            estimate: None,
        }
    }

    /// Resets the base from one state report.
    ///
    /// A report without a duration keeps the previously known one.
    pub fn apply(&mut self, state: RemoteState) -> PositionEstimate {
        let received_at_ms = state
            .received_at_ms
            .unwrap_or_else(|| self.wallclock.now_ms());
        let known_duration_ms = known_duration(state.duration_ms)
            .or_else(|| self.estimate.and_then(|estimate| estimate.known_duration_ms));
        let estimate = PositionEstimate {
            base_position_ms: state.position_ms,
            base_wallclock_ms: received_at_ms,
            is_paused: state.paused,
            known_duration_ms,
        };

        if let Some(previous) = self.estimate {
            debug!(
                extrapolated = previous.position_at(received_at_ms),
                reported = state.position_ms,
                drift_ms = previous.drift_ms(state.position_ms, received_at_ms),
                paused = state.paused,
                "remote position resynced"
            );
        } else {
            debug!(
                reported = state.position_ms,
                paused = state.paused,
                "remote position established"
            );
        }

        self.estimate = Some(estimate);
        estimate
    }

    /// Current position, or zero before the first report.
    pub fn now_ms(&self) -> i64 {
        self.estimate
            .map(|estimate| estimate.position_at(self.wallclock.now_ms()))
            .unwrap_or(0)
    }

    pub fn estimate(&self) -> Option<PositionEstimate> {
        self.estimate
    }

    pub fn is_paused(&self) -> bool {
        self.estimate.is_none_or(|estimate| estimate.is_paused)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.estimate
            .and_then(|estimate| estimate.known_duration_ms)
    }

    /// Drops the base so reads return zero until the next report.
    pub fn invalidate(&mut self) {
        if self.estimate.take().is_some() {
            debug!("remote position invalidated");
        }
    }
}
