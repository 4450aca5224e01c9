use std::fs;
use std::path::Path;

use cue_engine::{
    Command, CueDocument, EditorConfig, Engine, EngineErrorEvent, Event, ImportedDocument,
    RemoteClock, SourceKind, Timeline, TrackLoad, TrackReference, active_cue, next_cue,
    read_document, time_until_next,
};
use playback::{
    ChannelRemoteControl, ManualWallclock, RemoteEvent, format_timestamp, parse_timestamp,
    remote_event_channel,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::{ActiveArgs, Cli, Commands, InspectArgs, NormalizeArgs, ReplayArgs};
use crate::error::{CliError, Result};

/// Upper bound on simulated ticks between records.
const MAX_REPLAY_STEPS: u64 = 1_000_000;

/// One line of a replay log.
#[derive(Debug, Clone, Deserialize)]
struct ReplayRecord {
    at_ms: i64,
    event: RemoteEvent,
}

/// Runs one subcommand and returns the lines to print.
pub fn run(cli: Cli) -> Result<Vec<String>> {
    let config = match cli.config.as_deref() {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Commands::Inspect(args) => inspect(&config, args),
        Commands::Active(args) => active(&config, args),
        Commands::Normalize(args) => normalize(&config, args),
        Commands::Replay(args) => replay(config, args),
    }
}

fn inspect(config: &EditorConfig, args: InspectArgs) -> Result<Vec<String>> {
    let imported = read_document(&args.document, &config.ranges)?;
    let mut lines = vec![
        format!("track: {}", describe_track(imported.track.as_ref())),
        format!(
            "duration: {}",
            imported
                .duration_ms
                .map(format_timestamp)
                .unwrap_or_else(|| "unknown".to_string())
        ),
        format!(
            "cues: {} (dropped {})",
            imported.timeline.len(),
            imported.dropped
        ),
    ];
    lines.extend(imported.timeline.cues().iter().map(|cue| {
        format!(
            "{:>10}  {:<8}  {}",
            cue.time(),
            cue.id().short(),
            cue.payload().label
        )
    }));
    Ok(lines)
}

fn active(config: &EditorConfig, args: ActiveArgs) -> Result<Vec<String>> {
    let at_ms = parse_timestamp(&args.at)?;
    let imported = read_document(&args.document, &config.ranges)?;
    let cues = imported.timeline.cues();

    let active_line = match active_cue(at_ms, cues) {
        Some(cue) => format!("active: {} {}", cue.time(), cue.payload().label),
        None => "active: none".to_string(),
    };
    let next_line = match (next_cue(at_ms, cues), time_until_next(at_ms, cues)) {
        (Some(cue), Some(remaining_ms)) => format!(
            "next: {} {} in {}",
            cue.time(),
            cue.payload().label,
            format_timestamp(remaining_ms)
        ),
        _ => "next: none".to_string(),
    };
    Ok(vec![active_line, next_line])
}

fn normalize(config: &EditorConfig, args: NormalizeArgs) -> Result<Vec<String>> {
    let imported = read_document(&args.document, &config.ranges)?;
    let document = CueDocument::export(
        imported.track.as_ref(),
        imported.duration_ms,
        imported.timeline.cues(),
    );

    match args.output {
        Some(path) => {
            document.write_to(&path)?;
            Ok(vec![format!(
                "wrote {} cues to {} (dropped {})",
                document.cues.len(),
                path.display(),
                imported.dropped
            )])
        }
        None => Ok(vec![document.to_json_pretty()?]),
    }
}

/// Drives a remote-clock session from a recorded event log.
///
/// Each record is queued at its `at_ms` wallclock time. While playback runs
/// toward an upcoming cue the session is ticked every `step_ms`; otherwise
/// the wallclock jumps straight to the next record.
fn replay(config: EditorConfig, args: ReplayArgs) -> Result<Vec<String>> {
    if args.step_ms <= 0 {
        return Err(CliError::InvalidArgument {
            reason: format!("--step-ms must be positive, got {}", args.step_ms),
        });
    }

    let imported = read_document(&args.document, &config.ranges)?;
    let records = read_replay_log(&args.events)?;
    let wallclock = ManualWallclock::new(0);
    let (control, _commands) = ChannelRemoteControl::channel();
    let (sender, inbox) = remote_event_channel(wallclock.clone());

    let mut engine = Engine::new(config);
    engine.attach_source(Box::new(
        RemoteClock::new(control, wallclock.clone()).with_inbox(inbox),
    ));
    engine.handle_command(Command::LoadTrack(track_load(imported)))?;

    let end_ms = records.last().map_or(0, |record| record.at_ms.max(0));
    let mut pending = records.into_iter().peekable();
    let mut lines = Vec::new();
    let mut now_ms = 0;
    let mut steps = 0u64;
    loop {
        wallclock.set(now_ms);
        while let Some(record) = pending.next_if(|record| record.at_ms <= now_ms) {
            let event = match record.event {
                RemoteEvent::State(state) => RemoteEvent::State(state.stamped(record.at_ms)),
                other => other,
            };
            sender.send(event)?;
        }

        let events = engine
            .handle_command(Command::Tick)
            .unwrap_or_else(|error| vec![Event::Error(EngineErrorEvent::from_error(&error))]);
        for event in events {
            if let Some(line) = describe_event(&event, engine.timeline(), now_ms) {
                lines.push(line);
            }
        }

        let Some(next_at_ms) = pending.peek().map(|record| record.at_ms) else {
            break;
        };
        now_ms = if engine.is_playing() && engine.next_cue().is_some() {
            steps += 1;
            if steps > MAX_REPLAY_STEPS {
                return Err(CliError::InvalidArgument {
                    reason: format!(
                        "replay needs more than {MAX_REPLAY_STEPS} steps; raise --step-ms"
                    ),
                });
            }
            now_ms.saturating_add(args.step_ms).min(next_at_ms)
        } else {
            next_at_ms
        };
    }

    info!(
        end_ms,
        reported = lines.len(),
        position_ms = engine.now_ms(),
        "replay finished"
    );
    Ok(lines)
}

fn read_replay_log(path: &Path) -> Result<Vec<ReplayRecord>> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayRecord =
            serde_json::from_str(line).map_err(|source| CliError::ReplayLog {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })?;
        records.push(record);
    }
    records.sort_by_key(|record| record.at_ms);
    debug!(path = %path.display(), records = records.len(), "replay log read");
    Ok(records)
}

fn track_load(imported: ImportedDocument) -> TrackLoad {
    TrackLoad {
        track: imported
            .track
            .unwrap_or_else(|| TrackReference::new(SourceKind::Remote, "replay")),
        duration_ms: imported.duration_ms,
        cues: imported.timeline.snapshot(),
    }
}

fn describe_track(track: Option<&TrackReference>) -> String {
    match track {
        Some(track) => format!("{} {}", track.source_kind.as_str(), track.id),
        None => "none".to_string(),
    }
}

fn describe_event(event: &Event, timeline: &Timeline, wallclock_ms: i64) -> Option<String> {
    let detail = match event {
        Event::ActiveCueChanged { current, t_ms, .. } => {
            let label = current
                .as_ref()
                .and_then(|id| timeline.get(id))
                .map_or("-", |cue| cue.payload().label.as_str());
            format!("active  {} {label}", format_timestamp(*t_ms))
        }
        Event::PositionResynced { t_ms } => format!("resync  {}", format_timestamp(*t_ms)),
        Event::Status(message) => format!("status  {message}"),
        Event::Error(error) => format!("error   {}", error.message),
        _ => return None,
    };
    Some(format!("{}  {detail}", format_timestamp(wallclock_ms)))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use playback::format_timestamp;

    use super::run;
    use crate::cli::{ActiveArgs, Cli, Commands, InspectArgs, NormalizeArgs, ReplayArgs};
    use crate::error::CliError;

    const DOCUMENT: &str = r#"{
        "version": 1,
        "source_kind": "remote",
        "track_reference": "spotify:track:abc",
        "duration_ms": 200000,
        "cues": [
            {"id": "climb", "t_ms": 6000, "label": "Climb"},
            {"id": "warmup", "t_ms": 1000, "label": "Warm up"},
            {"label": "no time"}
        ]
    }"#;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("fixture should be written");
        path
    }

    fn cli(command: Commands) -> Cli {
        Cli {
            config: None,
            command,
        }
    }

    fn replay(document: &Path, events: &Path) -> Vec<String> {
        run(cli(Commands::Replay(ReplayArgs {
            document: document.to_path_buf(),
            events: events.to_path_buf(),
            step_ms: 100,
        })))
        .expect("replay should succeed")
    }

    #[test]
    fn inspect_lists_sorted_cues_and_dropped_count() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);

        let lines = run(cli(Commands::Inspect(InspectArgs { document })))
            .expect("inspect should succeed");

        assert_eq!(lines[0], "track: remote spotify:track:abc");
        assert_eq!(lines[1], "duration: 3:20.000");
        assert_eq!(lines[2], "cues: 2 (dropped 1)");
        assert!(lines[3].contains("Warm up"));
        assert!(lines[4].contains("Climb"));
    }

    #[test]
    fn active_resolves_current_and_next_cue() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);

        let lines = run(cli(Commands::Active(ActiveArgs {
            document,
            at: "0:05".to_string(),
        })))
        .expect("active should succeed");

        assert_eq!(
            lines,
            vec![
                "active: 0:01.000 Warm up".to_string(),
                "next: 0:06.000 Climb in 0:01.000".to_string(),
            ]
        );
    }

    #[test]
    fn active_rejects_unparseable_position() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);

        let result = run(cli(Commands::Active(ActiveArgs {
            document,
            at: "soon".to_string(),
        })));
        assert!(matches!(result, Err(CliError::Playback(_))));
    }

    #[test]
    fn normalize_writes_a_clean_document() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);
        let output = dir.path().join("clean.json");

        let lines = run(cli(Commands::Normalize(NormalizeArgs {
            document,
            output: Some(output.clone()),
        })))
        .expect("normalize should succeed");
        assert!(lines[0].starts_with("wrote 2 cues"));

        let text = fs::read_to_string(&output).expect("output should exist");
        let value: serde_json::Value = serde_json::from_str(&text).expect("output is JSON");
        assert_eq!(value["cues"][0]["id"], "warmup");
        assert_eq!(value["cues"][0]["time"], "0:01.000");
        assert_eq!(value["cues"][1]["id"], "climb");
    }

    #[test]
    fn replay_reports_resyncs_and_cue_transitions() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);
        let events = write(
            &dir,
            "events.jsonl",
            concat!(
                r#"{"at_ms":0,"event":{"type":"ready","device_id":"studio"}}"#,
                "\n",
                r#"{"at_ms":0,"event":{"type":"state","position_ms":500,"paused":false}}"#,
                "\n\n",
                r#"{"at_ms":2000,"event":{"type":"state","position_ms":5900,"paused":false}}"#,
                "\n",
                r#"{"at_ms":2300,"event":{"type":"failure","message":"rate limited"}}"#,
                "\n",
            ),
        );

        let lines = replay(&document, &events);

        assert_eq!(
            lines,
            vec![
                "0:00.000  status  playback device studio ready".to_string(),
                "0:00.000  resync  0:00.500".to_string(),
                "0:00.500  active  0:01.000 Warm up".to_string(),
                "0:02.000  resync  0:05.900".to_string(),
                "0:02.100  active  0:06.000 Climb".to_string(),
                "0:02.300  status  remote playback failure: rate limited".to_string(),
            ]
        );
    }

    #[test]
    fn replay_jumps_over_gaps_with_no_cue_ahead() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);
        let events = write(
            &dir,
            "events.jsonl",
            concat!(
                r#"{"at_ms":0,"event":{"type":"state","position_ms":5500,"paused":false}}"#,
                "\n",
                r#"{"at_ms":1000000000000000,"event":{"type":"failure","message":"gone"}}"#,
                "\n",
            ),
        );

        let lines = replay(&document, &events);

        assert_eq!(
            lines,
            vec![
                "0:00.000  resync  0:05.500".to_string(),
                "0:00.000  active  0:05.500 Warm up".to_string(),
                "0:00.500  active  0:06.000 Climb".to_string(),
                format!(
                    "{}  status  remote playback failure: gone",
                    format_timestamp(1_000_000_000_000_000)
                ),
            ]
        );
    }

    #[test]
    fn replay_rejects_malformed_log_line() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);
        let events = write(&dir, "events.jsonl", "{\"at_ms\":0}\n");

        let result = run(cli(Commands::Replay(ReplayArgs {
            document,
            events,
            step_ms: 100,
        })));
        assert!(matches!(result, Err(CliError::ReplayLog { line: 1, .. })));
    }

    #[test]
    fn replay_rejects_non_positive_step() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let document = write(&dir, "ride.json", DOCUMENT);
        let events = write(&dir, "events.jsonl", "");

        let result = run(cli(Commands::Replay(ReplayArgs {
            document,
            events,
            step_ms: 0,
        })));
        assert!(matches!(result, Err(CliError::InvalidArgument { .. })));
    }
}
