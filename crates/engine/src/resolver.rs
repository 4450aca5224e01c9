use crate::cue::{Cue, CueId};

/// Returns the cue in effect at `now_ms`: the last cue with `t_ms <= now_ms`.
///
/// `cues` must be sorted ascending by `t_ms`.
///
/// # Example
/// ```
/// use cue_engine::{Cue, CueId, CuePayload, active_cue};
///
/// let cues = vec![
///     Cue::new(CueId::new("a"), 1_000, CuePayload::default()),
///     Cue::new(CueId::new("b"), 6_000, CuePayload::default()),
/// ];
/// assert!(active_cue(0, &[]).is_none());
/// assert_eq!(active_cue(5_000, &cues).map(|cue| cue.t_ms()), Some(1_000));
/// ```
pub fn active_cue(now_ms: i64, cues: &[Cue]) -> Option<&Cue> {
    let after = cues.partition_point(|cue| cue.t_ms() <= now_ms);
    after.checked_sub(1).map(|index| &cues[index])
}

/// Returns the first cue strictly after `now_ms`.
pub fn next_cue(now_ms: i64, cues: &[Cue]) -> Option<&Cue> {
    let after = cues.partition_point(|cue| cue.t_ms() <= now_ms);
    cues.get(after)
}

/// Milliseconds until the next cue starts.
pub fn time_until_next(now_ms: i64, cues: &[Cue]) -> Option<i64> {
    next_cue(now_ms, cues).map(|cue| cue.t_ms() - now_ms)
}

/// Transition between two resolved cues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCueChange {
    pub previous: Option<CueId>,
    pub current: Option<CueId>,
}

/// Remembers the last resolved cue so callers react only to transitions.
#[derive(Debug, Clone, Default)]
pub struct ActiveCueTracker {
    current: Option<CueId>,
}

impl ActiveCueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CueId> {
        self.current.as_ref()
    }

    /// Re-resolves the active cue and reports a change, if any.
    pub fn update(&mut self, now_ms: i64, cues: &[Cue]) -> Option<ActiveCueChange> {
        let resolved = active_cue(now_ms, cues).map(|cue| cue.id().clone());
        if resolved == self.current {
            return None;
        }

        let previous = std::mem::replace(&mut self.current, resolved.clone());
        Some(ActiveCueChange {
            previous,
            current: resolved,
        })
    }
}
