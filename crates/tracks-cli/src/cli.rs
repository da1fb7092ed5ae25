//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracks_core::MetadataPolicy;
use tracks_io::Leniency;

/// Most played tracks of the longest listening sessions.
///
/// Splits each user's play log into sessions on gaps of more than 20 minutes,
/// keeps the sessions with the most plays and reports the tracks played most
/// often within them.
#[derive(Debug, Parser)]
#[command(name = "top-tracks", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the top tracks of the top sessions to a TSV report.
    Run(RunArgs),

    /// Show the top sessions.
    Sessions(SessionsArgs),
}

/// Options shared by every command that reads a play log.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Tab-separated play log without header:
    /// `user_id`, `played_at`, `artist_id`, `artist_name`, `track_id`, `track_name`.
    pub input: PathBuf,

    /// Number of sessions to keep (default from config: 50).
    #[arg(short = 's', long = "top-sessions")]
    pub top_sessions: Option<usize>,

    /// Minutes between plays after which a new session starts (default: 20).
    #[arg(long)]
    pub gap_minutes: Option<u32>,

    /// Malformed row handling: fail-fast, drop-malformed or permissive.
    #[arg(long)]
    pub leniency: Option<Leniency>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Report path. Defaults to a timestamped file in the configured output directory.
    pub output: Option<PathBuf>,

    /// Number of tracks to report (default from config: 10).
    #[arg(short = 'n', long = "top-tracks")]
    pub top_tracks: Option<usize>,

    /// Track metadata conflicts: canonical or all-variants.
    #[arg(long)]
    pub metadata_policy: Option<MetadataPolicy>,

    /// Add a `play_count` column to the report.
    #[arg(long)]
    pub with_counts: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SessionsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
