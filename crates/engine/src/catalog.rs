use std::collections::HashMap;

use tracing::debug;

use crate::cue::Cue;
use crate::document::TrackReference;
use crate::error::Result;

/// Stored cues and duration for one track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedTrack {
    pub duration_ms: Option<i64>,
    pub cues: Vec<Cue>,
}

/// Lookup and save seam for per-track cue lists.
pub trait TrackCatalog {
    /// Returns the saved track, or `None` for a track seen for the first time.
    fn load(&self, track: &TrackReference) -> Result<Option<SavedTrack>>;

    fn save(&mut self, track: &TrackReference, duration_ms: Option<i64>, cues: &[Cue])
    -> Result<()>;
}

/// Catalog kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    tracks: HashMap<TrackReference, SavedTrack>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl TrackCatalog for MemoryCatalog {
    fn load(&self, track: &TrackReference) -> Result<Option<SavedTrack>> {
        Ok(self.tracks.get(track).cloned())
    }

    fn save(
        &mut self,
        track: &TrackReference,
        duration_ms: Option<i64>,
        cues: &[Cue],
    ) -> Result<()> {
        debug!(track = %track.id, cue_count = cues.len(), "track saved to catalog");
        self.tracks.insert(
            track.clone(),
            SavedTrack {
                duration_ms,
                cues: cues.to_vec(),
            },
        );
        Ok(())
    }
}
