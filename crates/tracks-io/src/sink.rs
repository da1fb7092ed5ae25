//! Report output.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use tracks_core::TopTrack;

use crate::IoError;

/// Report columns, in order.
pub const HEADER: [&str; 4] = ["track_id", "artist_id", "artist_name", "track_name"];

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    /// Append a `play_count` column.
    pub include_play_count: bool,
}

/// Write a report as TSV with a header row.
pub fn write_tracks_to<W: Write>(
    writer: W,
    tracks: &[TopTrack],
    options: &WriteOptions,
) -> Result<(), IoError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    let mut header = HEADER.to_vec();
    if options.include_play_count {
        header.push("play_count");
    }
    wtr.write_record(&header)?;

    for track in tracks {
        let play_count = track.play_count.to_string();
        let mut row = vec![
            track.track_id.as_str(),
            track.artist_id.as_str(),
            track.artist_name.as_str(),
            track.track_name.as_str(),
        ];
        if options.include_play_count {
            row.push(&play_count);
        }
        wtr.write_record(&row)?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write a report to `path`, replacing any existing file.
///
/// The report is written to a temporary file in the same directory and renamed
/// into place only after it was fully written.
pub fn write_tracks(path: &Path, tracks: &[TopTrack], options: &WriteOptions) -> Result<(), IoError> {
    let write_err = |source| IoError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    write_tracks_to(&mut tmp, tracks, options)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    // dropping the returned temp file removes it
    tmp.persist(path).map_err(|e| IoError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    tracing::debug!(path = %path.display(), rows = tracks.len(), "wrote report");
    Ok(())
}
