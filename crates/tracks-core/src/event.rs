//! Track-play events as loaded and as validated for the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::UserId;

/// A play record as produced by a loader.
///
/// `user_id` and `played_at` may be absent: the loader does not decide whether
/// a null ordering key is fatal, the pipeline does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecord {
    /// 1-based line in the source file.
    pub line: usize,
    pub user_id: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
    pub artist_id: String,
    pub artist_name: String,
    pub track_id: String,
    pub track_name: String,
}

/// A validated play event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub line: usize,
    pub user_id: UserId,
    pub played_at: DateTime<Utc>,
    pub artist_id: String,
    pub artist_name: String,
    pub track_id: String,
    pub track_name: String,
}

impl PlayEvent {
    /// Validates the fields the segmenter orders and partitions by.
    pub fn from_record(record: PlayRecord, stage: &'static str) -> Result<Self, PipelineError> {
        let missing = |field| PipelineError::MissingField {
            stage,
            field,
            line: record.line,
        };
        let user_id = record
            .user_id
            .as_deref()
            .and_then(|id| UserId::new(id).ok())
            .ok_or_else(|| missing("user_id"))?;
        let played_at = record.played_at.ok_or_else(|| missing("played_at"))?;

        Ok(Self {
            line: record.line,
            user_id,
            played_at,
            artist_id: record.artist_id,
            artist_name: record.artist_name,
            track_id: record.track_id,
            track_name: record.track_name,
        })
    }

    /// The descriptive fields attached to a track in the final output.
    pub fn metadata(&self) -> TrackMetadata {
        TrackMetadata {
            artist_id: self.artist_id.clone(),
            artist_name: self.artist_name.clone(),
            track_name: self.track_name.clone(),
        }
    }
}

/// Artist and title attached to a track id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub artist_id: String,
    pub artist_name: String,
    pub track_name: String,
}

/// Any pipeline record that wraps a play event.
///
/// Stages take `&[E] where E: Playable` so they can be applied to the output
/// of a previous stage (or to themselves) without unwrapping first.
pub trait Playable {
    fn play(&self) -> &PlayEvent;
}

impl Playable for PlayEvent {
    fn play(&self) -> &PlayEvent {
        self
    }
}

/// Validates every record, failing on the first missing ordering key.
pub fn validate_records(records: Vec<PlayRecord>) -> Result<Vec<PlayEvent>, PipelineError> {
    records
        .into_iter()
        .map(|record| PlayEvent::from_record(record, "segmentation"))
        .collect()
}
