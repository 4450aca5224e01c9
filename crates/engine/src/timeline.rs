use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::FieldRanges;
use crate::cue::{Cue, CueEdit, CueId, CuePayload};
use crate::error::{EngineError, Result};
use crate::time::clamp_to_track;

/// Ordered cue set for one track session.
///
/// Cues are kept sorted ascending by `t_ms` with unique ids. Sorting is
/// stable, so cues sharing a timestamp keep their prior relative order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    cues: Vec<Cue>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a timeline from unordered cues, regenerating ids that repeat.
    pub fn from_cues(cues: Vec<Cue>) -> Self {
        let mut timeline = Self {
            cues: dedup_ids(cues),
        };
        timeline.sort();
        timeline
    }

    /// Like [`Timeline::from_cues`], with every cue clamped to the track and
    /// to the payload field ranges.
    pub fn from_cues_clamped(
        cues: Vec<Cue>,
        duration_ms: Option<i64>,
        ranges: &FieldRanges,
    ) -> Self {
        Self::from_cues(
            cues.into_iter()
                .map(|cue| cue.clamped(duration_ms, ranges))
                .collect(),
        )
    }

    /// Cues in ascending `t_ms` order.
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn get(&self, id: &CueId) -> Option<&Cue> {
        self.cues.iter().find(|cue| cue.id() == id)
    }

    /// Copies the current cue list for the history stack.
    pub fn snapshot(&self) -> Vec<Cue> {
        self.cues.clone()
    }

    /// Inserts one cue. Fails when the id is already present.
    pub fn insert(&mut self, cue: Cue) -> Result<()> {
        if self.get(cue.id()).is_some() {
            warn!(id = %cue.id(), "insert rejected: duplicate id");
            return Err(EngineError::DuplicateCueId {
                id: cue.id().clone(),
            });
        }

        debug!(id = %cue.id(), t_ms = cue.t_ms(), "cue inserted");
        self.cues.push(cue);
        self.sort();
        Ok(())
    }

    /// Applies a multi-field edit to one cue and returns the updated cue.
    ///
    /// A new timestamp is clamped to the track and re-derives the display
    /// time. Numeric payload fields are re-clamped to `ranges`.
    ///
    /// # Example
    /// ```
    /// use cue_engine::{Cue, CueEdit, CueId, CuePayload, FieldRanges, Timeline};
    ///
    /// let id = CueId::new("a");
    /// let mut timeline = Timeline::from_cues(vec![Cue::new(id.clone(), 1_000, CuePayload::default())]);
    /// let edit = CueEdit { gear: Some(Some(45)), ..CueEdit::at(2_500) };
    ///
    /// let cue = timeline
    ///     .update(&id, edit, &FieldRanges::default(), Some(2_000))
    ///     .expect("cue exists");
    /// assert_eq!(cue.t_ms(), 2_000);
    /// assert_eq!(cue.time(), "0:02.000");
    /// assert_eq!(cue.payload().gear, Some(30));
    /// ```
    pub fn update(
        &mut self,
        id: &CueId,
        edit: CueEdit,
        ranges: &FieldRanges,
        duration_ms: Option<i64>,
    ) -> Result<Cue> {
        let index = self.require_index(id)?;
        let cue = &mut self.cues[index];

        if let Some(t_ms) = edit.t_ms {
            cue.set_t_ms(clamp_to_track(t_ms, duration_ms));
        }
        let mut payload = cue.payload().clone();
        edit.apply_payload(&mut payload);
        cue.set_payload(payload.clamped(ranges));

        let updated = cue.clone();
        debug!(id = %id, t_ms = updated.t_ms(), "cue updated");
        self.sort();
        Ok(updated)
    }

    /// Moves one cue to `t_ms` and replaces its whole payload.
    pub(crate) fn resnap(&mut self, id: &CueId, t_ms: i64, payload: CuePayload) -> Result<Cue> {
        let index = self.require_index(id)?;
        let cue = &mut self.cues[index];
        cue.set_t_ms(t_ms);
        cue.set_payload(payload);

        let updated = cue.clone();
        self.sort();
        Ok(updated)
    }

    /// Shifts one cue by `delta_ms`, clamped to the track.
    pub fn nudge(&mut self, id: &CueId, delta_ms: i64, duration_ms: Option<i64>) -> Result<Cue> {
        let index = self.require_index(id)?;
        let cue = &mut self.cues[index];
        let from_ms = cue.t_ms();
        cue.set_t_ms(clamp_to_track(from_ms.saturating_add(delta_ms), duration_ms));

        let updated = cue.clone();
        debug!(id = %id, from_ms, to_ms = updated.t_ms(), "cue nudged");
        self.sort();
        Ok(updated)
    }

    /// Removes one cue and returns it.
    pub fn remove(&mut self, id: &CueId) -> Result<Cue> {
        let index = self.require_index(id)?;
        let removed = self.cues.remove(index);
        debug!(
            id = %id,
            t_ms = removed.t_ms(),
            cue_count = self.cues.len(),
            "cue removed"
        );
        Ok(removed)
    }

    /// Replaces every cue at once and returns the previous list.
    pub fn replace(&mut self, cues: Vec<Cue>) -> Vec<Cue> {
        let next = Self::from_cues(cues);
        debug!(
            previous_count = self.cues.len(),
            cue_count = next.cues.len(),
            "timeline replaced"
        );
        std::mem::replace(&mut self.cues, next.cues)
    }

    /// Replaces every cue, clamping each one to the track and field ranges.
    pub fn replace_clamped(
        &mut self,
        cues: Vec<Cue>,
        duration_ms: Option<i64>,
        ranges: &FieldRanges,
    ) -> Vec<Cue> {
        let next = Self::from_cues_clamped(cues, duration_ms, ranges);
        debug!(
            previous_count = self.cues.len(),
            cue_count = next.cues.len(),
            ?duration_ms,
            "timeline replaced"
        );
        std::mem::replace(&mut self.cues, next.cues)
    }

    /// Removes every cue within `window_ms` of `t_ms` except `keep`.
    pub(crate) fn remove_within(&mut self, t_ms: i64, window_ms: i64, keep: &CueId) -> Vec<Cue> {
        let window = window_ms.unsigned_abs();
        let (removed, kept): (Vec<Cue>, Vec<Cue>) = std::mem::take(&mut self.cues)
            .into_iter()
            .partition(|cue| cue.id() != keep && cue.t_ms().abs_diff(t_ms) <= window);
        self.cues = kept;
        removed
    }

    /// Restores a snapshot taken by [`Timeline::snapshot`].
    pub(crate) fn restore(&mut self, snapshot: Vec<Cue>) {
        self.cues = snapshot;
        self.sort();
    }

    /// Index of the cue nearest to `t_ms` within `window_ms`.
    ///
    /// On equal distance the earlier cue in timeline order wins.
    pub fn nearest_within(&self, t_ms: i64, window_ms: i64) -> Option<usize> {
        let mut best: Option<(usize, i64)> = None;
        for (index, cue) in self.cues.iter().enumerate() {
            let distance = cue.t_ms().abs_diff(t_ms);
            if distance > window_ms.unsigned_abs() {
                continue;
            }
            let distance = i64::try_from(distance).unwrap_or(i64::MAX);
            if best.is_none_or(|(_, best_distance)| distance < best_distance) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }

    fn require_index(&self, id: &CueId) -> Result<usize> {
        self.cues
            .iter()
            .position(|cue| cue.id() == id)
            .ok_or_else(|| {
                warn!(id = %id, "cue not found");
                EngineError::CueNotFound { id: id.clone() }
            })
    }

    fn sort(&mut self) {
        self.cues.sort_by_key(Cue::t_ms);
    }
}

fn dedup_ids(mut cues: Vec<Cue>) -> Vec<Cue> {
    let mut seen = HashSet::with_capacity(cues.len());
    for cue in &mut cues {
        if !seen.insert(cue.id().clone()) {
            let fresh = CueId::generate();
            warn!(duplicate = %cue.id(), replacement = %fresh, "duplicate cue id regenerated");
            cue.reassign_id(fresh.clone());
            seen.insert(fresh);
        }
    }
    cues
}
