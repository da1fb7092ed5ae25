//! Run command: write the top tracks of the top sessions to a report.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use tracks_core::{PipelineStats, run_pipeline};
use tracks_io::{WriteOptions, write_tracks};

use super::util::{load_play_log, pipeline_params};
use crate::{Config, RunArgs};

/// What a run did, printed after the report is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub dropped_rows: usize,
    #[serde(flatten)]
    pub stats: PipelineStats,
}

/// Report path used when none is given: `top_most_played_tracks_<run id>.tsv`.
pub fn default_output_path(output_dir: &Path, now: DateTime<Local>) -> PathBuf {
    output_dir.join(format!(
        "top_most_played_tracks_{}.tsv",
        now.format("%Y%m%d%H%M%S")
    ))
}

pub fn run<W: Write>(writer: &mut W, args: &RunArgs, config: &Config) -> Result<RunSummary> {
    let loaded = load_play_log(&args.input, config)?;

    let mut params = pipeline_params(&args.input, config);
    params.top_tracks = args.top_tracks.unwrap_or(config.top_tracks_number);
    params.metadata_policy = args.metadata_policy.unwrap_or(config.metadata_policy);

    let output = run_pipeline(loaded.records, &params).context("top tracks computation failed")?;

    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&config.output_dir, Local::now()));
    let options = WriteOptions {
        include_play_count: args.with_counts || config.include_play_count,
    };
    write_tracks(&output_path, &output.tracks, &options)
        .with_context(|| format!("failed to write report {}", output_path.display()))?;

    let summary = RunSummary {
        input: args.input.input.clone(),
        output: output_path,
        dropped_rows: loaded.dropped,
        stats: output.stats,
    };
    tracing::info!(
        output = %summary.output.display(),
        sessions = summary.stats.sessions,
        selected_sessions = summary.stats.selected_sessions,
        tracks = summary.stats.tracks_emitted,
        "report written"
    );

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &summary)?;
        writeln!(writer)?;
    } else {
        writeln!(
            writer,
            "Wrote {} tracks from the top {} of {} sessions to {}",
            summary.stats.tracks_emitted,
            summary.stats.selected_sessions,
            summary.stats.sessions,
            summary.output.display()
        )?;
        if summary.dropped_rows > 0 {
            writeln!(writer, "Skipped {} malformed rows", summary.dropped_rows)?;
        }
    }

    Ok(summary)
}
