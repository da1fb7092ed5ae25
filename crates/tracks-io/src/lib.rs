//! File input and output for top-tracks reports.
//!
//! # Input
//!
//! Play logs are tab-separated, header-less, with six columns:
//! `user_id`, `played_at`, `artist_id`, `artist_name`, `track_id`, `track_name`.
//! Quote characters carry no meaning; every tab is a separator.
//!
//! ## Timestamp Format
//!
//! `played_at` is RFC 3339 (`2009-05-04T23:08:57Z`) or a naive
//! `YYYY-MM-DD HH:MM:SS[.fff]` interpreted as UTC.
//!
//! # Output
//!
//! Reports are tab-separated with a header row. They are written to a temporary
//! file next to the destination and renamed over it once complete, so a failed
//! run never leaves a partial report behind.

use std::path::PathBuf;

use thiserror::Error;

pub mod loader;
pub mod sink;

pub use loader::{Leniency, LoadOptions, LoadOutcome, load_events, read_events};
pub use sink::{WriteOptions, write_tracks, write_tracks_to};

/// Input and output errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// The input file could not be opened.
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An error from the TSV reader or writer.
    #[error("tsv error: {0}")]
    Csv(#[from] csv::Error),
    /// A row did not match the fixed schema.
    #[error("malformed row on line {line}: {message}")]
    MalformedRow { line: usize, message: String },
    /// Writing the report failed.
    #[error("failed to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The finished report could not be moved into place.
    #[error("failed to replace {}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
