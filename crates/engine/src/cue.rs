use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::FieldRanges;
use crate::time::{clamp_to_track, format_timestamp};

/// Opaque cue identifier, stable across edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CueId(String);

impl CueId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for human-facing output only.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Low/high cadence range for a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaceRange {
    pub low: i64,
    pub high: i64,
}

/// Choreography payload carried by a cue.
///
/// The engine treats it as opaque except for clamping the numeric fields to
/// their declared ranges. Keys without a dedicated field are kept in `extra`
/// and written back next to the known ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuePayload {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gear: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace: Option<PaceRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CuePayload {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Returns the payload with numeric fields clamped into `ranges`.
    ///
    /// A pace range given high-before-low is reordered.
    ///
    /// # Example
    /// ```
    /// use cue_engine::{CuePayload, FieldRanges};
    ///
    /// let payload = CuePayload { gear: Some(99), ..CuePayload::default() };
    /// assert_eq!(payload.clamped(&FieldRanges::default()).gear, Some(30));
    /// ```
    pub fn clamped(self, ranges: &FieldRanges) -> Self {
        Self {
            gear: self.gear.map(|gear| ranges.gear.clamp(gear)),
            pace: self.pace.map(|pace| {
                let low = ranges.pace.clamp(pace.low.min(pace.high));
                let high = ranges.pace.clamp(pace.low.max(pace.high));
                PaceRange { low, high }
            }),
            ..self
        }
    }
}

/// One time-stamped choreography instruction.
///
/// `time` is the display form of `t_ms` and is re-derived whenever the
/// timestamp changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cue {
    id: CueId,
    t_ms: i64,
    time: String,
    #[serde(flatten)]
    payload: CuePayload,
}

impl Cue {
    pub fn new(id: CueId, t_ms: i64, payload: CuePayload) -> Self {
        Self {
            id,
            t_ms,
            time: format_timestamp(t_ms),
            payload,
        }
    }

    pub fn id(&self) -> &CueId {
        &self.id
    }

    pub fn t_ms(&self) -> i64 {
        self.t_ms
    }

    /// Display-formatted timestamp (`m:ss.mmm`).
    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn payload(&self) -> &CuePayload {
        &self.payload
    }

    /// Returns the cue with its timestamp clamped to the track and its
    /// numeric payload fields clamped into `ranges`.
    pub fn clamped(self, duration_ms: Option<i64>, ranges: &FieldRanges) -> Self {
        Self::new(
            self.id,
            clamp_to_track(self.t_ms, duration_ms),
            self.payload.clamped(ranges),
        )
    }

    pub(crate) fn set_t_ms(&mut self, t_ms: i64) {
        self.t_ms = t_ms;
        self.time = format_timestamp(t_ms);
    }

    pub(crate) fn set_payload(&mut self, payload: CuePayload) {
        self.payload = payload;
    }

    pub(crate) fn reassign_id(&mut self, id: CueId) {
        self.id = id;
    }
}

/// Field edits applied to one cue as a single history step.
///
/// Outer `None` leaves a field untouched; `Some(None)` clears an optional
/// field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueEdit {
    pub t_ms: Option<i64>,
    pub label: Option<String>,
    pub kind: Option<Option<String>>,
    pub gear: Option<Option<i64>>,
    pub pace: Option<Option<PaceRange>>,
    pub position: Option<Option<String>>,
    pub note: Option<Option<String>>,
}

impl CueEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn at(t_ms: i64) -> Self {
        Self {
            t_ms: Some(t_ms),
            ..Self::default()
        }
    }

    pub(crate) fn apply_payload(self, payload: &mut CuePayload) {
        if let Some(label) = self.label {
            payload.label = label;
        }
        if let Some(kind) = self.kind {
            payload.kind = kind;
        }
        if let Some(gear) = self.gear {
            payload.gear = gear;
        }
        if let Some(pace) = self.pace {
            payload.pace = pace;
        }
        if let Some(position) = self.position {
            payload.position = position;
        }
        if let Some(note) = self.note {
            payload.note = note;
        }
    }
}
