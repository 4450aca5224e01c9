use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Monotonic millisecond clock with an arbitrary origin.
pub trait Wallclock {
    fn now_ms(&self) -> i64;
}

/// Wallclock backed by [`Instant`], counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemWallclock {
    origin: Instant,
}

impl SystemWallclock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemWallclock {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallclock for SystemWallclock {
    fn now_ms(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

/// Manually driven wallclock for replays and tests.
///
/// Clones share the same reading, so a handle kept by the driver moves every
/// consumer forward at once.
///
/// # Example
/// ```
/// use playback::{ManualWallclock, Wallclock};
///
/// let clock = ManualWallclock::new(1_000);
/// let observer = clock.clone();
/// clock.advance(250);
/// assert_eq!(observer.now_ms(), 1_250);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualWallclock {
    now_ms: Arc<AtomicI64>,
}

impl ManualWallclock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, t_ms: i64) {
        self.now_ms.store(t_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Wallclock for ManualWallclock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
