//! Core domain logic for top-tracks reporting.
//!
//! This crate contains the fundamental types and logic for:
//! - Session inference: splitting each user's plays on gaps over 20 minutes
//! - Session ranking: ordering sessions by play count and keeping the top-K
//! - Track ranking: the top-N tracks played within the selected sessions

mod error;
pub mod event;
pub mod pipeline;
pub mod segment;
pub mod sessions;
pub mod tracks;
mod types;

pub use error::PipelineError;
pub use event::{PlayEvent, PlayRecord, Playable, TrackMetadata, validate_records};
pub use pipeline::{PipelineOutput, PipelineParams, PipelineStats, run_on_events, run_pipeline};
pub use segment::{SessionConfig, SessionEvent, TimedEvent, segment_sessions};
pub use sessions::{RankedSession, SessionSummary};
pub use tracks::{MetadataPolicy, TopTrack};
pub use types::{SessionKey, UserId, ValidationError};
