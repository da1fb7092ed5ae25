//! The end-to-end top-tracks-in-top-sessions computation.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::PipelineError;
use crate::event::{PlayEvent, PlayRecord, validate_records};
use crate::segment::{SessionConfig, segment_sessions};
use crate::sessions::{
    RankedSession, events_in_sessions, rank_sessions, select_top_sessions, summarize_sessions,
};
use crate::tracks::{MetadataPolicy, TopTrack, attach_metadata, count_tracks, top_tracks};

/// Parameters for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineParams {
    /// How many tracks to emit (N).
    pub top_tracks: usize,
    /// How many sessions to consider (K).
    pub top_sessions: usize,
    pub session: SessionConfig,
    pub metadata_policy: MetadataPolicy,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            top_tracks: 10,
            top_sessions: 50,
            session: SessionConfig::default(),
            metadata_policy: MetadataPolicy::default(),
        }
    }
}

/// Record counts observed at each stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub events: usize,
    pub users: usize,
    pub sessions: usize,
    pub selected_sessions: usize,
    pub selected_events: usize,
    pub distinct_tracks: usize,
    pub tracks_emitted: usize,
}

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Selected tracks, most played first.
    pub tracks: Vec<TopTrack>,
    /// The sessions the tracks were counted in, by rank.
    pub top_sessions: Vec<RankedSession>,
    pub stats: PipelineStats,
}

/// Validate loaded records and run every stage.
pub fn run_pipeline(
    records: Vec<PlayRecord>,
    params: &PipelineParams,
) -> Result<PipelineOutput, PipelineError> {
    let events = validate_records(records)?;
    Ok(run_on_events(&events, params))
}

/// Run every stage over validated events.
pub fn run_on_events(events: &[PlayEvent], params: &PipelineParams) -> PipelineOutput {
    let segmented = segment_sessions(events, &params.session);
    let users = segmented
        .iter()
        .map(|e| &e.event.user_id)
        .collect::<HashSet<_>>()
        .len();

    let ranked = rank_sessions(summarize_sessions(&segmented));
    let top_sessions = select_top_sessions(&ranked, params.top_sessions);
    tracing::debug!(
        sessions = ranked.len(),
        selected = top_sessions.len(),
        "ranked sessions"
    );

    let selected_events = events_in_sessions(&segmented, &top_sessions);
    let counts = count_tracks(&selected_events);
    let distinct_tracks = counts.len();
    let top = top_tracks(counts, params.top_tracks);
    let tracks = attach_metadata(&top, &selected_events, params.metadata_policy);
    tracing::debug!(
        selected_events = selected_events.len(),
        distinct_tracks,
        emitted = tracks.len(),
        "selected top tracks"
    );

    let stats = PipelineStats {
        events: events.len(),
        users,
        sessions: ranked.len(),
        selected_sessions: top_sessions.len(),
        selected_events: selected_events.len(),
        distinct_tracks,
        tracks_emitted: tracks.len(),
    };

    PipelineOutput {
        tracks,
        top_sessions,
        stats,
    }
}
