use cue_engine::{
    Command, Cue, CueDocument, CueId, CuePayload, EditorConfig, Engine, EngineError, Event,
    FieldRanges, PaceRange, SourceKind, Timeline, TrackLoad, TrackReference, read_document,
};

fn sample_cues() -> Vec<Cue> {
    vec![
        Cue::new(
            CueId::new("warmup"),
            0,
            CuePayload {
                kind: Some("seated".to_string()),
                gear: Some(8),
                pace: Some(PaceRange { low: 80, high: 90 }),
                ..CuePayload::labeled("Warm up")
            },
        ),
        Cue::new(
            CueId::new("climb"),
            64_250,
            CuePayload {
                position: Some("standing".to_string()),
                note: Some("add two gears on the chorus".to_string()),
                ..CuePayload::labeled("Climb")
            },
        ),
        Cue::new(CueId::new("sprint"), 125_999, CuePayload::labeled("Sprint")),
    ]
}

fn loaded_engine() -> Engine {
    let mut engine = Engine::new(EditorConfig::default());
    engine
        .handle_command(Command::LoadTrack(TrackLoad {
            track: TrackReference::new(SourceKind::Remote, "spotify:track:4uLU6hMCjMI75M1A2tKUQC"),
            duration_ms: Some(210_000),
            cues: sample_cues(),
        }))
        .expect("load should succeed");
    engine
}

#[test]
fn export_then_import_file_yields_equal_timeline() {
    let engine = loaded_engine();
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("cues.json");

    engine
        .export_document()
        .write_to(&path)
        .expect("document should be written");
    let imported =
        read_document(&path, &FieldRanges::default()).expect("document should be read");

    assert_eq!(imported.timeline, *engine.timeline());
    assert_eq!(imported.track, engine.track().cloned());
    assert_eq!(imported.duration_ms, Some(210_000));
    assert_eq!(imported.dropped, 0);
}

#[test]
fn export_command_then_import_command_round_trips_through_engine() {
    let mut engine = loaded_engine();
    let events = engine
        .handle_command(Command::Export)
        .expect("export should succeed");
    let [Event::Exported(document)] = events.as_slice() else {
        panic!("export must emit exactly one Exported event");
    };
    let text = document.to_json_pretty().expect("document serializes");

    let mut other = Engine::new(EditorConfig::default());
    other
        .handle_command(Command::Import { text })
        .expect("import should succeed");

    assert_eq!(other.timeline(), engine.timeline());
    assert!(other.history().can_undo());
}

#[test]
fn exported_cues_are_sorted() {
    let cues = vec![
        Cue::new(CueId::new("late"), 9_000, CuePayload::default()),
        Cue::new(CueId::new("early"), 1_000, CuePayload::default()),
    ];
    let timeline = Timeline::from_cues(cues);
    let document = CueDocument::export(None, None, timeline.cues());

    let value = serde_json::to_value(&document).expect("document serializes");
    assert_eq!(value["cues"][0]["id"], "early");
    assert_eq!(value["cues"][1]["id"], "late");
    assert!(value["source_kind"].is_null());
}

#[test]
fn unreadable_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let result = read_document(&dir.path().join("missing.json"), &FieldRanges::default());

    assert!(matches!(result, Err(EngineError::DocumentIo { .. })));
}

#[test]
fn rejected_import_keeps_the_loaded_timeline() {
    let mut engine = loaded_engine();
    let before = engine.timeline().clone();

    for text in [
        "[]",
        r#"{"version":1}"#,
        r#"{"version":7,"cues":[]}"#,
        "not json at all",
    ] {
        let result = engine.handle_command(Command::Import {
            text: text.to_string(),
        });
        assert!(result.is_err(), "{text} should be rejected");
        assert_eq!(*engine.timeline(), before);
    }
}
