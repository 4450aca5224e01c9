use playback::RemoteEvent;
use tracing::{debug, info, warn};

use crate::catalog::TrackCatalog;
use crate::clock::{ClockNotice, ClockSource, SourceKind};
use crate::config::EditorConfig;
use crate::cue::{Cue, CueEdit, CueId, CuePayload};
use crate::document::{CueDocument, TrackReference, parse_document};
use crate::error::{EngineError, Result};
use crate::history::History;
use crate::resolver::{ActiveCueTracker, active_cue, next_cue};
use crate::snap::SnapMergeEditor;
use crate::time::{clamp_to_track, known_duration};
use crate::timeline::Timeline;

/// Track to open in the session, with its previously saved cues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackLoad {
    pub track: TrackReference,
    pub duration_ms: Option<i64>,
    pub cues: Vec<Cue>,
}

/// Commands accepted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Switches the session to another track.
    ///
    /// The cue list is replaced wholesale, history is reset and the attached
    /// clock source is invalidated.
    LoadTrack(TrackLoad),
    /// One poll of the session loop: drains queued remote events, then
    /// re-resolves the active cue.
    Tick,
    /// Applies one remote event directly, bypassing the inbox.
    RemoteEvent(RemoteEvent),
    Play,
    Pause,
    TogglePlayback,
    Seek {
        t_ms: i64,
    },
    /// Marks a cue at the current position, merging into a cue within the
    /// snap window.
    ///
    /// # Example
    /// ```
    /// use cue_engine::{Command, CuePayload, EditorConfig, Engine, Event, LocalClock};
    /// use playback::{LocalTransport, ManualWallclock};
    ///
    /// let wallclock = ManualWallclock::new(0);
    /// let mut engine = Engine::new(EditorConfig::default());
    /// engine.attach_source(Box::new(LocalClock::new(LocalTransport::new(
    ///     wallclock,
    ///     Some(120_000),
    /// ))));
    /// engine
    ///     .handle_command(Command::Seek { t_ms: 10_000 })
    ///     .expect("seek should succeed");
    ///
    /// let events = engine
    ///     .handle_command(Command::MarkNow {
    ///         payload: CuePayload::labeled("Sprint"),
    ///     })
    ///     .expect("mark should succeed");
    /// assert!(matches!(events[0], Event::CueMarked { merged: false, .. }));
    /// assert_eq!(engine.timeline().cues()[0].t_ms(), 10_000);
    /// ```
    MarkNow {
        payload: CuePayload,
    },
    /// Applies a multi-field edit as one history step.
    EditCue {
        id: CueId,
        edit: CueEdit,
    },
    /// Shifts one cue by `steps` times the configured nudge step.
    NudgeCue {
        id: CueId,
        steps: i64,
    },
    DeleteCue {
        id: CueId,
    },
    ClearCues,
    Undo,
    Redo,
    /// Replaces the timeline with the cues of a JSON document.
    ///
    /// A rejected document leaves the timeline untouched.
    Import {
        text: String,
    },
    Export,
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TimelineChanged(TimelineSnapshot),
    ActiveCueChanged {
        previous: Option<CueId>,
        current: Option<CueId>,
        t_ms: i64,
    },
    PositionResynced {
        t_ms: i64,
    },
    CueMarked {
        id: CueId,
        merged: bool,
    },
    Exported(CueDocument),
    Status(String),
    Error(EngineErrorEvent),
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    TrackNotLoaded,
    CueNotFound,
    InvalidDocument,
    Playback,
    Other,
}

impl From<&EngineError> for EngineErrorKind {
    fn from(value: &EngineError) -> Self {
        match value {
            EngineError::TrackNotLoaded => Self::TrackNotLoaded,
            EngineError::CueNotFound { .. } => Self::CueNotFound,
            EngineError::InvalidDocument { .. }
            | EngineError::UnsupportedDocumentVersion { .. }
            | EngineError::DocumentParse(_) => Self::InvalidDocument,
            EngineError::Playback(_) => Self::Playback,
            _ => Self::Other,
        }
    }
}

/// User-facing error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineErrorEvent {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineErrorEvent {
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            kind: EngineErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

/// Immutable timeline snapshot consumed by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSnapshot {
    pub track: Option<TrackReference>,
    pub duration_ms: Option<i64>,
    pub cues: Vec<Cue>,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// One editing session: the attached clock source, the active track and its
/// cue timeline with undo history.
#[derive(Debug)]
pub struct Engine {
    config: EditorConfig,
    source: Option<Box<dyn ClockSource>>,
    track: Option<TrackReference>,
    duration_ms: Option<i64>,
    timeline: Timeline,
    history: History,
    editor: SnapMergeEditor,
    tracker: ActiveCueTracker,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Engine {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            history: History::new(config.history_depth),
            editor: SnapMergeEditor::new(config.snap_window_ms),
            config,
            source: None,
            track: None,
            duration_ms: None,
            timeline: Timeline::new(),
            tracker: ActiveCueTracker::new(),
        }
    }

    /// Attaches a clock source, invalidating the one it replaces.
    pub fn attach_source(&mut self, source: Box<dyn ClockSource>) {
        let kind = source.kind();
        if let Some(mut previous) = self.source.replace(source) {
            previous.invalidate();
            info!(
                previous = previous.kind().as_str(),
                kind = kind.as_str(),
                "playback source switched"
            );
        } else {
            info!(kind = kind.as_str(), "playback source attached");
        }
    }

    /// Detaches and invalidates the current clock source.
    pub fn detach_source(&mut self) -> Option<Box<dyn ClockSource>> {
        let mut source = self.source.take()?;
        source.invalidate();
        info!(kind = source.kind().as_str(), "playback source detached");
        Some(source)
    }

    pub fn source_kind(&self) -> Option<SourceKind> {
        self.source.as_ref().map(|source| source.kind())
    }

    pub fn is_source_available(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.is_available())
    }

    /// True while an available source is advancing the position.
    pub fn is_playing(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.is_available() && !source.is_paused())
    }

    /// Current playback position. Zero while no source is available.
    pub fn now_ms(&self) -> i64 {
        match self.source.as_ref() {
            Some(source) if source.is_available() => {
                clamp_to_track(source.now_ms(), self.duration_ms())
            }
            _ => 0,
        }
    }

    /// Track duration: the loaded value, else whatever the source reports.
    pub fn duration_ms(&self) -> Option<i64> {
        known_duration(self.duration_ms).or_else(|| {
            self.source
                .as_ref()
                .and_then(|source| known_duration(source.duration_ms()))
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn track(&self) -> Option<&TrackReference> {
        self.track.as_ref()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn active_cue(&self) -> Option<&Cue> {
        active_cue(self.now_ms(), self.timeline.cues())
    }

    pub fn next_cue(&self) -> Option<&Cue> {
        next_cue(self.now_ms(), self.timeline.cues())
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            track: self.track.clone(),
            duration_ms: self.duration_ms(),
            cues: self.timeline.snapshot(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        match command {
            Command::LoadTrack(load) => Ok(self.load_track(load)),
            Command::Tick => Ok(self.tick()),
            Command::RemoteEvent(event) => Ok(self.remote_event(event)),
            Command::Play => Ok(self.transport("play", |source| source.play())),
            Command::Pause => Ok(self.transport("pause", |source| source.pause())),
            Command::TogglePlayback => Ok(self.transport("toggle", |source| {
                if source.is_paused() {
                    source.play()
                } else {
                    source.pause()
                }
            })),
            Command::Seek { t_ms } => {
                let target = clamp_to_track(t_ms, self.duration_ms());
                Ok(self.transport("seek", |source| source.seek(target)))
            }
            Command::MarkNow { payload } => Ok(self.mark_now(payload)),
            Command::EditCue { id, edit } => self.edit_cue(id, edit),
            Command::NudgeCue { id, steps } => self.nudge_cue(id, steps),
            Command::DeleteCue { id } => self.apply_edit("delete", |timeline, _| {
                timeline.remove(&id).map(|_| ())
            }),
            Command::ClearCues => self.clear(),
            Command::Undo => Ok(self.undo()),
            Command::Redo => Ok(self.redo()),
            Command::Import { text } => self.import(&text),
            Command::Export => Ok(vec![Event::Exported(self.export_document())]),
        }
    }

    /// Opens a track from a catalog. Unknown tracks start with no cues.
    pub fn open_track(
        &mut self,
        catalog: &dyn TrackCatalog,
        track: TrackReference,
        duration_ms: Option<i64>,
    ) -> Result<Vec<Event>> {
        let saved = catalog.load(&track)?.unwrap_or_default();
        let duration_ms = known_duration(duration_ms).or(saved.duration_ms);
        Ok(self.load_track(TrackLoad {
            track,
            duration_ms,
            cues: saved.cues,
        }))
    }

    /// Saves the current cues back to a catalog.
    pub fn save_track(&self, catalog: &mut dyn TrackCatalog) -> Result<()> {
        let track = self.track.as_ref().ok_or(EngineError::TrackNotLoaded)?;
        catalog.save(track, self.duration_ms(), self.timeline.cues())?;
        info!(track = %track.id, cue_count = self.timeline.len(), "track saved");
        Ok(())
    }

    pub fn export_document(&self) -> CueDocument {
        CueDocument::export(
            self.track.as_ref(),
            self.duration_ms(),
            self.timeline.cues(),
        )
    }

    fn load_track(&mut self, load: TrackLoad) -> Vec<Event> {
        if let Some(source) = self.source.as_mut() {
            source.invalidate();
        }
        self.duration_ms = known_duration(load.duration_ms);
        self.timeline =
            Timeline::from_cues_clamped(load.cues, self.duration_ms, &self.config.ranges);
        self.history.clear();
        info!(
            track = %load.track.id,
            source_kind = load.track.source_kind.as_str(),
            cue_count = self.timeline.len(),
            "track loaded"
        );
        self.track = Some(load.track);
        self.timeline_changed()
    }

    fn tick(&mut self) -> Vec<Event> {
        let notices = match self.source.as_mut() {
            Some(source) => source.poll(),
            None => Vec::new(),
        };
        let mut events: Vec<Event> = notices.into_iter().map(notice_event).collect();
        events.extend(self.refresh_active_cue());
        events
    }

    fn remote_event(&mut self, event: RemoteEvent) -> Vec<Event> {
        let Some(source) = self.source.as_mut() else {
            debug!(?event, "remote event ignored: no playback source");
            return Vec::new();
        };
        let mut events: Vec<Event> = source
            .handle_remote_event(event)
            .map(notice_event)
            .into_iter()
            .collect();
        events.extend(self.refresh_active_cue());
        events
    }

    fn transport<F>(&mut self, command: &'static str, action: F) -> Vec<Event>
    where
        F: FnOnce(&mut dyn ClockSource) -> playback::Result<()>,
    {
        let Some(source) = self.source.as_deref_mut() else {
            debug!(command, "transport ignored: no playback source");
            return Vec::new();
        };
        if let Err(error) = action(source) {
            warn!(command, %error, "transport command failed");
            return vec![Event::Status(format!("{command} failed: {error}"))];
        }

        debug!(command, "transport command sent");
        self.refresh_active_cue().into_iter().collect()
    }

    fn mark_now(&mut self, payload: CuePayload) -> Vec<Event> {
        if !self.is_source_available() {
            debug!("mark ignored: no playback source available");
            return Vec::new();
        }

        let now_ms = self.now_ms();
        let duration_ms = self.duration_ms();
        let outcome = self.editor.mark_or_update(
            &mut self.timeline,
            &mut self.history,
            now_ms,
            duration_ms,
            payload,
            &self.config.ranges,
        );

        let mut events = vec![Event::CueMarked {
            id: outcome.cue().id().clone(),
            merged: outcome.is_merge(),
        }];
        events.extend(self.timeline_changed());
        events
    }

    fn edit_cue(&mut self, id: CueId, edit: CueEdit) -> Result<Vec<Event>> {
        if edit.is_empty() {
            return Ok(Vec::new());
        }
        let ranges = self.config.ranges;
        self.apply_edit("edit", |timeline, duration_ms| {
            timeline.update(&id, edit, &ranges, duration_ms).map(|_| ())
        })
    }

    fn nudge_cue(&mut self, id: CueId, steps: i64) -> Result<Vec<Event>> {
        if self.timeline.get(&id).is_none() {
            return Err(EngineError::CueNotFound { id });
        }
        if steps == 0 {
            return Ok(Vec::new());
        }
        let delta_ms = steps.saturating_mul(self.config.nudge_step_ms);
        self.apply_edit("nudge", |timeline, duration_ms| {
            timeline.nudge(&id, delta_ms, duration_ms).map(|_| ())
        })
    }

    fn clear(&mut self) -> Result<Vec<Event>> {
        if self.timeline.is_empty() {
            return Ok(Vec::new());
        }
        self.apply_edit("clear", |timeline, _| {
            timeline.replace(Vec::new());
            Ok(())
        })
    }

    fn undo(&mut self) -> Vec<Event> {
        let Some(previous) = self.history.undo(self.timeline.snapshot()) else {
            debug!("undo ignored: history is empty");
            return Vec::new();
        };
        self.timeline.restore(previous);
        info!(cue_count = self.timeline.len(), "undo applied to timeline");
        self.timeline_changed()
    }

    fn redo(&mut self) -> Vec<Event> {
        let Some(next) = self.history.redo(self.timeline.snapshot()) else {
            debug!("redo ignored: nothing to redo");
            return Vec::new();
        };
        self.timeline.restore(next);
        info!(cue_count = self.timeline.len(), "redo applied to timeline");
        self.timeline_changed()
    }

    fn import(&mut self, text: &str) -> Result<Vec<Event>> {
        let imported = match parse_document(text, &self.config.ranges) {
            Ok(imported) => imported,
            Err(error) => {
                warn!(%error, "import rejected; timeline kept");
                return Err(error);
            }
        };
        let dropped = imported.dropped;
        let cues = imported.timeline.snapshot();
        let ranges = self.config.ranges;

        let mut events = self.apply_edit("import", |timeline, duration_ms| {
            timeline.replace_clamped(cues, duration_ms, &ranges);
            Ok(())
        })?;
        if dropped > 0 {
            events.push(Event::Status(format!(
                "imported {} cues; dropped {dropped} malformed entries",
                self.timeline.len()
            )));
        }
        Ok(events)
    }

    /// Runs one timeline mutation as a single history step.
    ///
    /// History is recorded only when the mutation succeeds.
    fn apply_edit<F>(&mut self, action: &'static str, edit: F) -> Result<Vec<Event>>
    where
        F: FnOnce(&mut Timeline, Option<i64>) -> Result<()>,
    {
        let before = self.timeline.snapshot();
        let duration_ms = self.duration_ms();
        edit(&mut self.timeline, duration_ms)?;
        self.history.push(before);

        info!(
            action,
            cue_count = self.timeline.len(),
            undo_len = self.history.undo_len(),
            "timeline edited"
        );
        Ok(self.timeline_changed())
    }

    fn timeline_changed(&mut self) -> Vec<Event> {
        let mut events = vec![Event::TimelineChanged(self.snapshot())];
        events.extend(self.refresh_active_cue());
        events
    }

    fn refresh_active_cue(&mut self) -> Option<Event> {
        let t_ms = self.now_ms();
        let change = self.tracker.update(t_ms, self.timeline.cues())?;
        debug!(
            previous = ?change.previous,
            current = ?change.current,
            t_ms,
            "active cue changed"
        );
        Some(Event::ActiveCueChanged {
            previous: change.previous,
            current: change.current,
            t_ms,
        })
    }
}

fn notice_event(notice: ClockNotice) -> Event {
    match notice {
        ClockNotice::Resynced(estimate) => Event::PositionResynced {
            t_ms: estimate.position_at(estimate.base_wallclock_ms),
        },
        ClockNotice::Ready { device_id } => {
            Event::Status(format!("playback device {device_id} ready"))
        }
        ClockNotice::NotReady { device_id } => {
            Event::Status(format!("playback device {device_id} went offline"))
        }
        ClockNotice::Failure { message } => {
            Event::Status(format!("remote playback failure: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use playback::{
        ChannelRemoteControl, LocalTransport, ManualWallclock, RemoteEvent, RemoteState,
        remote_event_channel,
    };

    use super::{Command, Engine, EngineErrorEvent, EngineErrorKind, Event, TrackLoad};
    use crate::catalog::{MemoryCatalog, TrackCatalog};
    use crate::clock::{LocalClock, RemoteClock, SourceKind};
    use crate::config::EditorConfig;
    use crate::cue::{Cue, CueEdit, CueId, CuePayload};
    use crate::document::TrackReference;
    use crate::error::EngineError;

    fn local_engine() -> (Engine, ManualWallclock) {
        let wallclock = ManualWallclock::new(0);
        let mut engine = Engine::new(EditorConfig::default());
        engine.attach_source(Box::new(LocalClock::new(LocalTransport::new(
            wallclock.clone(),
            Some(120_000),
        ))));
        (engine, wallclock)
    }

    fn seek(engine: &mut Engine, t_ms: i64) {
        engine
            .handle_command(Command::Seek { t_ms })
            .expect("seek should succeed");
    }

    fn mark(engine: &mut Engine, label: &str) -> Vec<Event> {
        engine
            .handle_command(Command::MarkNow {
                payload: CuePayload::labeled(label),
            })
            .expect("mark should succeed")
    }

    fn cue(id: &str, t_ms: i64) -> Cue {
        Cue::new(CueId::new(id), t_ms, CuePayload::labeled(id))
    }

    fn load(engine: &mut Engine, cues: Vec<Cue>) {
        engine
            .handle_command(Command::LoadTrack(TrackLoad {
                track: TrackReference::new(SourceKind::Local, "ride.mp3"),
                duration_ms: Some(120_000),
                cues,
            }))
            .expect("load should succeed");
    }

    fn state(position_ms: i64, paused: bool) -> RemoteEvent {
        RemoteEvent::State(RemoteState {
            position_ms,
            paused,
            duration_ms: Some(200_000),
            received_at_ms: None,
        })
    }

    #[test]
    fn mark_without_source_is_a_noop() {
        let mut engine = Engine::default();

        let events = mark(&mut engine, "nothing");

        assert!(events.is_empty());
        assert!(engine.timeline().is_empty());
        assert_eq!(engine.now_ms(), 0);
        assert!(!engine.history().can_undo());
    }

    #[test]
    fn marks_inside_snap_window_merge() {
        let (mut engine, _wallclock) = local_engine();

        seek(&mut engine, 10_000);
        mark(&mut engine, "first");
        seek(&mut engine, 10_200);
        let events = mark(&mut engine, "second");

        assert!(matches!(events[0], Event::CueMarked { merged: true, .. }));
        assert_eq!(engine.timeline().len(), 1);
        let cue = &engine.timeline().cues()[0];
        assert_eq!(cue.t_ms(), 10_200);
        assert_eq!(cue.payload().label, "second");
    }

    #[test]
    fn marks_outside_snap_window_create_two_cues() {
        let (mut engine, _wallclock) = local_engine();

        seek(&mut engine, 10_000);
        mark(&mut engine, "first");
        seek(&mut engine, 11_000);
        mark(&mut engine, "second");

        assert_eq!(engine.timeline().len(), 2);
    }

    #[test]
    fn undo_restores_pre_mark_timeline_and_redo_reapplies() {
        let (mut engine, _wallclock) = local_engine();
        seek(&mut engine, 1_000);
        mark(&mut engine, "one");
        let before = engine.timeline().snapshot();
        seek(&mut engine, 5_000);
        mark(&mut engine, "two");
        let after = engine.timeline().snapshot();

        engine
            .handle_command(Command::Undo)
            .expect("undo should succeed");
        assert_eq!(engine.timeline().snapshot(), before);

        let events = engine
            .handle_command(Command::Redo)
            .expect("redo should succeed");
        assert_eq!(engine.timeline().snapshot(), after);
        let Event::TimelineChanged(snapshot) = &events[0] else {
            panic!("first event must be TimelineChanged");
        };
        assert!(snapshot.can_undo);
        assert!(!snapshot.can_redo);
    }

    #[test]
    fn undo_with_empty_history_emits_nothing() {
        let (mut engine, _wallclock) = local_engine();

        let events = engine
            .handle_command(Command::Undo)
            .expect("undo should succeed");
        assert!(events.is_empty());
    }

    #[test]
    fn edit_unknown_cue_fails_without_recording_history() {
        let (mut engine, _wallclock) = local_engine();
        load(&mut engine, vec![cue("a", 1_000)]);

        let result = engine.handle_command(Command::EditCue {
            id: CueId::new("missing"),
            edit: CueEdit::at(2_000),
        });

        assert!(matches!(result, Err(EngineError::CueNotFound { .. })));
        assert!(!engine.history().can_undo());
    }

    #[test]
    fn multi_field_edit_is_one_history_step() {
        let (mut engine, _wallclock) = local_engine();
        load(&mut engine, vec![cue("a", 1_000)]);

        engine
            .handle_command(Command::EditCue {
                id: CueId::new("a"),
                edit: CueEdit {
                    label: Some("Climb".to_string()),
                    gear: Some(Some(99)),
                    ..CueEdit::at(4_000)
                },
            })
            .expect("edit should succeed");

        let cue = &engine.timeline().cues()[0];
        assert_eq!(cue.t_ms(), 4_000);
        assert_eq!(cue.payload().gear, Some(30));
        assert_eq!(engine.history().undo_len(), 1);
    }

    #[test]
    fn nudge_moves_by_configured_step() {
        let (mut engine, _wallclock) = local_engine();
        load(&mut engine, vec![cue("a", 1_000)]);

        engine
            .handle_command(Command::NudgeCue {
                id: CueId::new("a"),
                steps: -3,
            })
            .expect("nudge should succeed");

        assert_eq!(engine.timeline().cues()[0].t_ms(), 700);
    }

    #[test]
    fn delete_then_clear_are_separate_history_steps() {
        let (mut engine, _wallclock) = local_engine();
        load(&mut engine, vec![cue("a", 1_000), cue("b", 2_000)]);

        engine
            .handle_command(Command::DeleteCue { id: CueId::new("a") })
            .expect("delete should succeed");
        engine
            .handle_command(Command::ClearCues)
            .expect("clear should succeed");
        assert!(engine.timeline().is_empty());

        let events = engine
            .handle_command(Command::ClearCues)
            .expect("clear should succeed");
        assert!(events.is_empty());
        assert_eq!(engine.history().undo_len(), 2);
    }

    #[test]
    fn malformed_import_preserves_timeline() {
        let (mut engine, _wallclock) = local_engine();
        load(&mut engine, vec![cue("a", 1_000)]);

        let result = engine.handle_command(Command::Import {
            text: r#"{"version":1,"cues":"nope"}"#.to_string(),
        });

        assert!(matches!(result, Err(EngineError::InvalidDocument { .. })));
        assert_eq!(engine.timeline().len(), 1);
        assert!(!engine.history().can_undo());
    }

    #[test]
    fn import_reports_dropped_entries() {
        let (mut engine, _wallclock) = local_engine();

        let events = engine
            .handle_command(Command::Import {
                text: r#"{"cues":[{"id":"x","t_ms":500},{"id":"y"}]}"#.to_string(),
            })
            .expect("import should succeed");

        assert_eq!(engine.timeline().len(), 1);
        assert!(
            events
                .iter()
                .any(|event| matches!(event, Event::Status(message) if message.contains("dropped 1")))
        );
    }

    #[test]
    fn tick_reports_active_cue_only_on_transition() {
        let (mut engine, wallclock) = local_engine();
        load(&mut engine, vec![cue("a", 1_000), cue("b", 6_000)]);
        engine
            .handle_command(Command::Play)
            .expect("play should succeed");

        wallclock.advance(500);
        assert!(engine.handle_command(Command::Tick).expect("tick").is_empty());

        wallclock.advance(700);
        let events = engine.handle_command(Command::Tick).expect("tick");
        assert_eq!(
            events,
            vec![Event::ActiveCueChanged {
                previous: None,
                current: Some(CueId::new("a")),
                t_ms: 1_200,
            }]
        );
        assert!(engine.handle_command(Command::Tick).expect("tick").is_empty());
        assert_eq!(engine.next_cue().map(|cue| cue.t_ms()), Some(6_000));
    }

    #[test]
    fn remote_state_event_resets_position_exactly() {
        let wallclock = ManualWallclock::new(0);
        let (control, _commands) = ChannelRemoteControl::channel();
        let mut engine = Engine::default();
        engine.attach_source(Box::new(RemoteClock::new(control, wallclock.clone())));

        engine
            .handle_command(Command::RemoteEvent(state(30_000, false)))
            .expect("event should apply");
        wallclock.advance(400);
        assert_eq!(engine.now_ms(), 30_400);

        let events = engine
            .handle_command(Command::RemoteEvent(state(30_100, false)))
            .expect("event should apply");
        assert_eq!(events, vec![Event::PositionResynced { t_ms: 30_100 }]);
        assert_eq!(engine.now_ms(), 30_100);
    }

    #[test]
    fn tick_drains_remote_inbox() {
        let wallclock = ManualWallclock::new(0);
        let (control, _commands) = ChannelRemoteControl::channel();
        let (sender, inbox) = remote_event_channel(wallclock.clone());
        let mut engine = Engine::default();
        engine.attach_source(Box::new(
            RemoteClock::new(control, wallclock.clone()).with_inbox(inbox),
        ));
        load(&mut engine, vec![cue("a", 1_000)]);

        sender.send(state(2_000, true)).expect("inbox is open");
        let events = engine.handle_command(Command::Tick).expect("tick");

        assert_eq!(events[0], Event::PositionResynced { t_ms: 2_000 });
        assert!(matches!(
            events[1],
            Event::ActiveCueChanged { t_ms: 2_000, .. }
        ));
        assert!(engine.is_source_available());
    }

    #[test]
    fn remote_transport_failure_is_reported_as_status() {
        let (control, _commands) = ChannelRemoteControl::channel();
        let mut engine = Engine::default();
        engine.attach_source(Box::new(RemoteClock::new(control, ManualWallclock::new(0))));

        let events = engine
            .handle_command(Command::Play)
            .expect("play should not fail the command");

        assert!(matches!(events.as_slice(), [Event::Status(_)]));
        assert!(mark(&mut engine, "offline").is_empty());
    }

    #[test]
    fn load_track_resets_history_and_position() {
        let (mut engine, wallclock) = local_engine();
        seek(&mut engine, 3_000);
        engine
            .handle_command(Command::Play)
            .expect("play should succeed");
        mark(&mut engine, "one");
        wallclock.advance(1_000);

        load(&mut engine, Vec::new());

        assert_eq!(engine.now_ms(), 0);
        assert!(engine.timeline().is_empty());
        assert!(!engine.history().can_undo());
        assert_eq!(
            engine.track(),
            Some(&TrackReference::new(SourceKind::Local, "ride.mp3"))
        );
    }

    #[test]
    fn catalog_round_trip_keeps_cues_per_track() {
        let (mut engine, _wallclock) = local_engine();
        let mut catalog = MemoryCatalog::new();
        let track = TrackReference::new(SourceKind::Local, "warmup");

        engine
            .open_track(&catalog, track.clone(), Some(60_000))
            .expect("open should succeed");
        seek(&mut engine, 2_500);
        mark(&mut engine, "go");
        engine
            .save_track(&mut catalog)
            .expect("save should succeed");

        let saved = catalog
            .load(&track)
            .expect("load should succeed")
            .expect("track saved");
        assert_eq!(saved.duration_ms, Some(60_000));
        assert_eq!(saved.cues, engine.timeline().snapshot());

        let mut fresh = Engine::default();
        fresh
            .open_track(&catalog, track, None)
            .expect("open should succeed");
        assert_eq!(fresh.timeline().snapshot(), saved.cues);
        assert_eq!(fresh.duration_ms(), Some(60_000));
    }

    #[test]
    fn loaded_cues_are_clamped_to_track_and_ranges() {
        let mut engine = Engine::default();
        let heavy = Cue::new(
            CueId::new("late"),
            90_000,
            CuePayload {
                gear: Some(99),
                ..CuePayload::labeled("late")
            },
        );

        engine
            .handle_command(Command::LoadTrack(TrackLoad {
                track: TrackReference::new(SourceKind::Remote, "track:7"),
                duration_ms: Some(60_000),
                cues: vec![cue("early", -500), heavy],
            }))
            .expect("load should succeed");

        let cues = engine.timeline().cues();
        assert_eq!(cues[0].t_ms(), 0);
        assert_eq!(cues[1].t_ms(), 60_000);
        assert_eq!(cues[1].payload().gear, Some(30));
    }

    #[test]
    fn catalog_cues_are_clamped_on_open() {
        let mut catalog = MemoryCatalog::new();
        let track = TrackReference::new(SourceKind::Local, "short");
        catalog
            .save(&track, Some(120_000), &[cue("a", 100_000)])
            .expect("save should succeed");

        let mut engine = Engine::default();
        engine
            .open_track(&catalog, track, Some(30_000))
            .expect("open should succeed");

        assert_eq!(engine.timeline().cues()[0].t_ms(), 30_000);
    }

    #[test]
    fn import_without_duration_is_clamped_to_loaded_track() {
        let mut engine = Engine::default();
        engine
            .handle_command(Command::LoadTrack(TrackLoad {
                track: TrackReference::new(SourceKind::Remote, "track:7"),
                duration_ms: Some(60_000),
                cues: Vec::new(),
            }))
            .expect("load should succeed");

        engine
            .handle_command(Command::Import {
                text: r#"{"cues":[{"id":"z","t_ms":90000,"gear":0}]}"#.to_string(),
            })
            .expect("import should succeed");

        let cue = &engine.timeline().cues()[0];
        assert_eq!(cue.t_ms(), 60_000);
        assert_eq!(cue.time(), "1:00.000");
        assert_eq!(cue.payload().gear, Some(1));
    }

    #[test]
    fn save_without_track_fails() {
        let engine = Engine::default();
        let mut catalog = MemoryCatalog::new();

        let result = engine.save_track(&mut catalog);
        assert!(matches!(result, Err(EngineError::TrackNotLoaded)));
    }

    #[test]
    fn document_errors_map_to_invalid_document_kind() {
        let error = EngineError::UnsupportedDocumentVersion { version: 3 };
        let event = EngineErrorEvent::from_error(&error);

        assert_eq!(event.kind, EngineErrorKind::InvalidDocument);
        assert_eq!(event.message, "unsupported cue document version 3");
    }
}
