//! Cue timeline engine: reconciles local and remote playback clocks into one
//! position and keeps an ordered, undoable set of choreography cues.

pub mod api;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod cue;
pub mod document;
pub mod error;
pub mod estimator;
pub mod history;
pub mod resolver;
pub mod snap;
pub mod time;
pub mod timeline;

pub use api::{
    Command, Engine, EngineErrorEvent, EngineErrorKind, Event, TimelineSnapshot, TrackLoad,
};
pub use catalog::{MemoryCatalog, SavedTrack, TrackCatalog};
pub use clock::{ClockNotice, ClockSource, LocalClock, RemoteClock, SourceKind};
pub use config::{Bounds, EditorConfig, FieldRanges};
pub use cue::{Cue, CueEdit, CueId, CuePayload, PaceRange};
pub use document::{
    CueDocument, DOCUMENT_VERSION, ImportedDocument, TrackReference, parse_document,
    read_document,
};
pub use error::{EngineError, Result};
pub use estimator::{PositionEstimate, PositionEstimator};
pub use history::History;
pub use resolver::{ActiveCueChange, ActiveCueTracker, active_cue, next_cue, time_until_next};
pub use snap::{MarkOutcome, SnapMergeEditor};
pub use timeline::Timeline;
