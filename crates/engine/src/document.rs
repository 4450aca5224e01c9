use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::clock::SourceKind;
use crate::config::FieldRanges;
use crate::cue::{Cue, CueId, CuePayload, PaceRange};
use crate::error::{EngineError, Result};
use crate::time::{clamp_to_track, floor_ms, known_duration};
use crate::timeline::Timeline;

/// Current cue document format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// Identifies a track within one kind of playback backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackReference {
    pub source_kind: SourceKind,
    pub id: String,
}

impl TrackReference {
    pub fn new(source_kind: SourceKind, id: impl Into<String>) -> Self {
        Self {
            source_kind,
            id: id.into(),
        }
    }
}

/// Versioned export form of one track's cues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CueDocument {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub source_kind: Option<SourceKind>,
    pub track_reference: Option<String>,
    pub duration_ms: Option<i64>,
    pub cues: Vec<Cue>,
}

impl CueDocument {
    /// Builds a document from a sorted cue list.
    pub fn export(track: Option<&TrackReference>, duration_ms: Option<i64>, cues: &[Cue]) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            created_at: Utc::now(),
            source_kind: track.map(|track| track.source_kind),
            track_reference: track.map(|track| track.id.clone()),
            duration_ms: known_duration(duration_ms),
            cues: cues.to_vec(),
        }
    }

    pub fn track(&self) -> Option<TrackReference> {
        match (self.source_kind, self.track_reference.as_ref()) {
            (Some(source_kind), Some(id)) => Some(TrackReference::new(source_kind, id.clone())),
            _ => None,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(EngineError::DocumentParse)
    }

    /// Writes the document as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut text = self.to_json_pretty()?;
        text.push('\n');
        fs::write(path, text).map_err(|source| EngineError::DocumentIo {
            context: "failed to write cue document",
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), cue_count = self.cues.len(), "cue document written");
        Ok(())
    }
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedDocument {
    pub track: Option<TrackReference>,
    pub duration_ms: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub timeline: Timeline,
    /// Entries skipped because they were malformed.
    pub dropped: usize,
}

/// Parses and validates a cue document.
///
/// The whole document is rejected when it is not an object, carries a newer
/// version, or lacks a `cues` array. Individual entries without a numeric
/// `t_ms` are dropped; a payload value of the wrong type drops only that
/// field. Fractional timestamps are floored and clamped to the track; entries
/// without an id get a fresh one.
///
/// # Example
/// ```
/// use cue_engine::{FieldRanges, parse_document};
///
/// let text = r#"{"version":1,"cues":[{"t_ms":6000.7,"label":"b"},{"t_ms":1000,"label":"a"},{"label":"x"}]}"#;
/// let imported = parse_document(text, &FieldRanges::default()).expect("valid document");
///
/// assert_eq!(imported.dropped, 1);
/// let times: Vec<i64> = imported.timeline.cues().iter().map(|cue| cue.t_ms()).collect();
/// assert_eq!(times, vec![1_000, 6_000]);
/// ```
pub fn parse_document(text: &str, ranges: &FieldRanges) -> Result<ImportedDocument> {
    let value: Value = serde_json::from_str(text).map_err(EngineError::DocumentParse)?;
    let Value::Object(root) = value else {
        return Err(invalid("document root must be an object"));
    };

    let version = match root.get("version") {
        None | Some(Value::Null) => u64::from(DOCUMENT_VERSION),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| invalid("`version` must be a non-negative integer"))?,
    };
    if version > u64::from(DOCUMENT_VERSION) {
        warn!(version, supported = DOCUMENT_VERSION, "cue document version rejected");
        return Err(EngineError::UnsupportedDocumentVersion { version });
    }

    let entries = match root.get("cues") {
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(invalid("`cues` must be an array")),
        None => return Err(invalid("missing `cues` array")),
    };

    let duration_ms = known_duration(root.get("duration_ms").and_then(Value::as_i64));
    let track = read_track(&root);
    let created_at = root
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|created_at| created_at.with_timezone(&Utc));

    let mut cues = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;
    for (index, entry) in entries.iter().enumerate() {
        match read_cue(entry, duration_ms, ranges) {
            Some(cue) => cues.push(cue),
            None => {
                warn!(index, "malformed cue entry dropped");
                dropped += 1;
            }
        }
    }

    let timeline = Timeline::from_cues(cues);
    debug!(
        version,
        cue_count = timeline.len(),
        dropped,
        "cue document parsed"
    );
    Ok(ImportedDocument {
        track,
        duration_ms,
        created_at,
        timeline,
        dropped,
    })
}

/// Reads and parses a cue document file.
pub fn read_document(path: &Path, ranges: &FieldRanges) -> Result<ImportedDocument> {
    let text = fs::read_to_string(path).map_err(|source| EngineError::DocumentIo {
        context: "failed to read cue document",
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&text, ranges)
}

fn read_track(root: &Map<String, Value>) -> Option<TrackReference> {
    let source_kind = root
        .get("source_kind")
        .cloned()
        .and_then(|value| serde_json::from_value::<SourceKind>(value).ok())?;
    let id = root.get("track_reference").and_then(Value::as_str)?;
    Some(TrackReference::new(source_kind, id))
}

fn read_cue(entry: &Value, duration_ms: Option<i64>, ranges: &FieldRanges) -> Option<Cue> {
    let Value::Object(fields) = entry else {
        return None;
    };

    let t_ms = match fields.get("t_ms") {
        Some(Value::Number(number)) => match number.as_i64() {
            Some(t_ms) => t_ms,
            None => floor_ms(number.as_f64()?)?,
        },
        _ => return None,
    };

    let id = match fields.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => CueId::new(id.clone()),
        Some(Value::Number(number)) => CueId::new(number.to_string()),
        _ => CueId::generate(),
    };

    let payload = read_payload(fields);

    Some(Cue::new(
        id,
        clamp_to_track(t_ms, duration_ms),
        payload.clamped(ranges),
    ))
}

/// Decodes payload keys one at a time. A value of the wrong type drops only
/// that key; unknown keys are carried in `extra`.
fn read_payload(fields: &Map<String, Value>) -> CuePayload {
    let mut payload = CuePayload::default();
    for (key, value) in fields {
        match key.as_str() {
            "id" | "t_ms" | "time" => {}
            "label" => {
                if let Some(label) = read_field::<String>(key, value) {
                    payload.label = label;
                }
            }
            "kind" => payload.kind = read_field::<Option<String>>(key, value).flatten(),
            "gear" => payload.gear = read_field::<Option<i64>>(key, value).flatten(),
            "pace" => payload.pace = read_field::<Option<PaceRange>>(key, value).flatten(),
            "position" => payload.position = read_field::<Option<String>>(key, value).flatten(),
            "note" => payload.note = read_field::<Option<String>>(key, value).flatten(),
            _ => {
                payload.extra.insert(key.clone(), value.clone());
            }
        }
    }
    payload
}

fn read_field<T: DeserializeOwned>(key: &str, value: &Value) -> Option<T> {
    match T::deserialize(value) {
        Ok(field) => Some(field),
        Err(error) => {
            debug!(key, %error, "cue payload field dropped");
            None
        }
    }
}

fn invalid(reason: &str) -> EngineError {
    EngineError::InvalidDocument {
        reason: reason.to_string(),
    }
}
