//! Shared utilities for CLI commands.

use anyhow::{Context, Result};
use tracks_core::{PipelineParams, SessionConfig};
use tracks_io::{LoadOptions, LoadOutcome, load_events};

use crate::{Config, InputArgs};

/// Load the play log named by `args`, applying the configured leniency.
pub fn load_play_log(args: &InputArgs, config: &Config) -> Result<LoadOutcome> {
    let options = LoadOptions {
        leniency: args.leniency.unwrap_or(config.leniency),
    };
    load_events(&args.input, &options)
        .with_context(|| format!("failed to load play log {}", args.input.display()))
}

/// Pipeline parameters from config, overridden by command-line flags.
pub fn pipeline_params(args: &InputArgs, config: &Config) -> PipelineParams {
    PipelineParams {
        top_tracks: config.top_tracks_number,
        top_sessions: args.top_sessions.unwrap_or(config.top_sessions_number),
        session: SessionConfig::from_minutes(
            args.gap_minutes.unwrap_or(config.session_gap_minutes),
        ),
        metadata_policy: config.metadata_policy,
    }
}
