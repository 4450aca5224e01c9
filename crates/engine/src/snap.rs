use tracing::info;

use crate::config::FieldRanges;
use crate::cue::{Cue, CueId, CuePayload};
use crate::history::History;
use crate::time::clamp_to_track;
use crate::timeline::Timeline;

/// Result of a "mark now" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// No cue was within the snap window; a new one was created.
    Created(Cue),
    /// An existing cue was re-marked at the new timestamp. Other cues left
    /// inside the window around the new timestamp are folded away.
    Merged {
        cue: Cue,
        previous_t_ms: i64,
        absorbed: Vec<CueId>,
    },
}

impl MarkOutcome {
    pub fn cue(&self) -> &Cue {
        match self {
            Self::Created(cue) => cue,
            Self::Merged { cue, .. } => cue,
        }
    }

    pub fn is_merge(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

/// Upsert editor that collapses repeated marks near the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapMergeEditor {
    window_ms: i64,
}

impl SnapMergeEditor {
    pub fn new(window_ms: i64) -> Self {
        Self {
            window_ms: window_ms.max(0),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Marks a cue at `now_ms` or re-marks the nearest cue inside the window.
    ///
    /// The pre-mutation timeline is pushed onto `history` first. A merge
    /// moves the matched cue to the new timestamp and replaces its whole
    /// payload; the id is kept. Any other cue then within the window of the
    /// new timestamp is removed, so one window never holds two cues.
    ///
    /// # Example
    /// ```
    /// use cue_engine::{CuePayload, FieldRanges, History, SnapMergeEditor, Timeline};
    ///
    /// let editor = SnapMergeEditor::new(250);
    /// let mut timeline = Timeline::new();
    /// let mut history = History::new(30);
    /// let ranges = FieldRanges::default();
    ///
    /// let first = editor.mark_or_update(&mut timeline, &mut history, 10_000, None, CuePayload::labeled("a"), &ranges);
    /// let second = editor.mark_or_update(&mut timeline, &mut history, 10_200, None, CuePayload::labeled("b"), &ranges);
    ///
    /// assert!(second.is_merge());
    /// assert_eq!(first.cue().id(), second.cue().id());
    /// assert_eq!(timeline.len(), 1);
    /// assert_eq!(timeline.cues()[0].t_ms(), 10_200);
    /// ```
    pub fn mark_or_update(
        &self,
        timeline: &mut Timeline,
        history: &mut History,
        now_ms: i64,
        duration_ms: Option<i64>,
        payload: CuePayload,
        ranges: &FieldRanges,
    ) -> MarkOutcome {
        let t_ms = clamp_to_track(now_ms, duration_ms);
        let payload = payload.clamped(ranges);
        history.push(timeline.snapshot());

        let target = timeline
            .nearest_within(t_ms, self.window_ms)
            .map(|index| &timeline.cues()[index])
            .map(|cue| (cue.id().clone(), cue.t_ms()));
        if let Some((id, previous_t_ms)) = target {
            if let Ok(cue) = timeline.resnap(&id, t_ms, payload.clone()) {
                let absorbed: Vec<CueId> = timeline
                    .remove_within(t_ms, self.window_ms, &id)
                    .into_iter()
                    .map(|cue| cue.id().clone())
                    .collect();
                info!(
                    id = %id,
                    previous_t_ms,
                    t_ms,
                    window_ms = self.window_ms,
                    absorbed = absorbed.len(),
                    "mark merged into existing cue"
                );
                return MarkOutcome::Merged {
                    cue,
                    previous_t_ms,
                    absorbed,
                };
            }
        }

        loop {
            let cue = Cue::new(CueId::generate(), t_ms, payload.clone());
            if timeline.insert(cue.clone()).is_ok() {
                info!(id = %cue.id(), t_ms, cue_count = timeline.len(), "cue created");
                return MarkOutcome::Created(cue);
            }
        }
    }
}
