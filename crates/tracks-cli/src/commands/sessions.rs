//! Sessions command: list the sessions the report would be computed from.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use tracks_core::{RankedSession, run_pipeline};

use super::util::{load_play_log, pipeline_params};
use crate::{Config, SessionsArgs};

/// Formats ranked sessions for terminal output.
pub fn format_sessions(sessions: &[RankedSession]) -> String {
    if sessions.is_empty() {
        return "No sessions found.\n".to_string();
    }

    let mut out = format!("Top {} sessions:\n", sessions.len());
    for session in sessions {
        let summary = &session.summary;
        writeln!(
            out,
            "#{} {} session {}: {} tracks ({} to {})",
            session.rank,
            summary.key.user_id,
            summary.key.session_id,
            summary.track_count,
            summary.first_played_at.format("%Y-%m-%d %H:%M"),
            summary.last_played_at.format("%Y-%m-%d %H:%M"),
        )
        .unwrap();
    }
    out
}

pub fn run<W: Write>(writer: &mut W, args: &SessionsArgs, config: &Config) -> Result<()> {
    let loaded = load_play_log(&args.input, config)?;

    let mut params = pipeline_params(&args.input, config);
    params.top_tracks = 0;
    let output = run_pipeline(loaded.records, &params).context("session ranking failed")?;

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &output.top_sessions)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_sessions(&output.top_sessions))?;
    }

    Ok(())
}
