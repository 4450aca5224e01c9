use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cuemark",
    about = "Inspect, normalize and replay choreography cue documents",
    version
)]
pub struct Cli {
    /// Editor config file (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the header and cues of a document.
    Inspect(InspectArgs),

    /// Resolve the cue in effect at a point in the track.
    Active(ActiveArgs),

    /// Re-export a document with validated, sorted and clamped cues.
    Normalize(NormalizeArgs),

    /// Replay a log of remote playback events against a document.
    Replay(ReplayArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    pub document: PathBuf,
}

#[derive(Debug, Args)]
pub struct ActiveArgs {
    pub document: PathBuf,

    /// Track position: milliseconds, `m:ss(.mmm)` or `h:mm:ss(.mmm)`.
    #[arg(long)]
    pub at: String,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    pub document: PathBuf,

    /// Output path. The document is printed when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ReplayArgs {
    pub document: PathBuf,

    /// JSON-lines file of `{"at_ms": .., "event": {..}}` records.
    #[arg(long)]
    pub events: PathBuf,

    /// Simulated poll interval.
    #[arg(long, default_value_t = 100)]
    pub step_ms: i64,
}
