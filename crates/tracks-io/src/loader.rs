//! Play log loading.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use serde::{Deserialize, Serialize};

use tracks_core::PlayRecord;

use crate::IoError;

const COLUMNS: usize = 6;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// What to do with a row that does not fit the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Leniency {
    /// Abort the load on the first malformed row.
    #[default]
    FailFast,
    /// Skip malformed rows and report how many were skipped.
    DropMalformed,
    /// Keep malformed rows, nulling values that cannot be parsed.
    Permissive,
}

impl Leniency {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FailFast => "fail-fast",
            Self::DropMalformed => "drop-malformed",
            Self::Permissive => "permissive",
        }
    }
}

impl fmt::Display for Leniency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Leniency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "drop-malformed" => Ok(Self::DropMalformed),
            "permissive" => Ok(Self::Permissive),
            _ => Err(format!("invalid leniency: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub leniency: Leniency,
}

/// Records read from a play log.
#[derive(Debug, Clone, Default)]
pub struct LoadOutcome {
    pub records: Vec<PlayRecord>,
    /// Rows skipped under [`Leniency::DropMalformed`].
    pub dropped: usize,
}

/// Load a play log from disk.
pub fn load_events(path: &Path, options: &LoadOptions) -> Result<LoadOutcome, IoError> {
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let outcome = read_events(BufReader::new(file), options)?;
    tracing::debug!(
        path = %path.display(),
        records = outcome.records.len(),
        dropped = outcome.dropped,
        "loaded play log"
    );
    Ok(outcome)
}

/// Read a play log from any reader.
pub fn read_events<R: Read>(reader: R, options: &LoadOptions) -> Result<LoadOutcome, IoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut outcome = LoadOutcome::default();

    for (idx, result) in rdr.records().enumerate() {
        let parsed = match result {
            Ok(row) => {
                let line = row
                    .position()
                    .and_then(|p| usize::try_from(p.line()).ok())
                    .unwrap_or(idx + 1);
                parse_row(&row, line, options.leniency).map_err(|message| (line, message))
            }
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                let line = e
                    .position()
                    .and_then(|p| usize::try_from(p.line()).ok())
                    .unwrap_or(idx + 1);
                Err((line, e.to_string()))
            }
        };

        match parsed {
            Ok(record) => outcome.records.push(record),
            Err((line, message)) => {
                if options.leniency == Leniency::FailFast {
                    return Err(IoError::MalformedRow { line, message });
                }
                tracing::debug!(line, %message, "dropping malformed row");
                outcome.dropped += 1;
            }
        }
    }

    if outcome.dropped > 0 {
        tracing::warn!(dropped = outcome.dropped, "skipped malformed rows");
    }

    Ok(outcome)
}

fn parse_row(row: &StringRecord, line: usize, leniency: Leniency) -> Result<PlayRecord, String> {
    if row.len() != COLUMNS && leniency != Leniency::Permissive {
        return Err(format!("expected {COLUMNS} columns, found {}", row.len()));
    }

    let field = |idx: usize| row.get(idx).unwrap_or_default();

    let user_id = Some(field(0))
        .filter(|id| !id.is_empty())
        .map(String::from);

    let raw_played_at = field(1).trim();
    let played_at = if raw_played_at.is_empty() {
        None
    } else {
        match parse_timestamp(raw_played_at) {
            Some(ts) => Some(ts),
            None if leniency == Leniency::Permissive => None,
            None => return Err(format!("invalid played_at: {raw_played_at}")),
        }
    };

    Ok(PlayRecord {
        line,
        user_id,
        played_at,
        artist_id: field(2).to_string(),
        artist_name: field(3).to_string(),
        track_id: field(4).to_string(),
        track_name: field(5).to_string(),
    })
}

/// Parse an RFC 3339 or naive UTC timestamp.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Cursor, Write};

    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "user_000001\t2009-05-04T23:08:57Z\tf1b1cf71-bd35-4e99-8624-24a6e15f133a\tDeep Dish\t\tFlashdance (Pacha Ibiza)-09-28-2007\n\
user_000001\t2009-05-04T13:54:10Z\ta7f7df4a-77d8-4f12-8acd-5c60c93f4de8\t坂本龍一\t\tComposition 0919 (Live_2009_4_15)\n\
user_000002\t2009-05-04 13:52:04\ta7f7df4a-77d8-4f12-8acd-5c60c93f4de8\t坂本龍一\tt-0001\tMc2 (Live_2009_4_15)\n";

    fn options(leniency: Leniency) -> LoadOptions {
        LoadOptions { leniency }
    }

    #[test]
    fn read_events_parses_all_columns() {
        let outcome = read_events(Cursor::new(SAMPLE), &LoadOptions::default()).unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.dropped, 0);

        let first = &outcome.records[0];
        assert_eq!(first.line, 1);
        assert_eq!(first.user_id.as_deref(), Some("user_000001"));
        assert_eq!(
            first.played_at,
            Some(Utc.with_ymd_and_hms(2009, 5, 4, 23, 8, 57).unwrap())
        );
        assert_eq!(first.artist_name, "Deep Dish");
        assert_eq!(first.track_id, "");

        let third = &outcome.records[2];
        assert_eq!(third.line, 3);
        assert_eq!(third.track_id, "t-0001");
        assert_eq!(
            third.played_at,
            Some(Utc.with_ymd_and_hms(2009, 5, 4, 13, 52, 4).unwrap())
        );
    }

    #[test]
    fn quotes_are_plain_characters() {
        let input = "u1\t2009-05-04T13:00:00Z\ta1\t\"Weird Al\" Yankovic\tt1\tSong \"x\n";
        let outcome = read_events(Cursor::new(input), &LoadOptions::default()).unwrap();
        assert_eq!(outcome.records[0].artist_name, "\"Weird Al\" Yankovic");
        assert_eq!(outcome.records[0].track_name, "Song \"x");
    }

    #[test]
    fn empty_keys_load_as_null() {
        let input = "\t\ta1\tArtist\tt1\tTitle\n";
        let outcome = read_events(Cursor::new(input), &LoadOptions::default()).unwrap();
        assert_eq!(outcome.records[0].user_id, None);
        assert_eq!(outcome.records[0].played_at, None);
    }

    #[test]
    fn user_ids_are_not_trimmed() {
        let input = "u1\t2009-05-04T13:00:00Z\ta\tA\tt\tT\n u1 \t2009-05-04T13:01:00Z\ta\tA\tt\tT\n \t2009-05-04T13:02:00Z\ta\tA\tt\tT\n";
        let outcome = read_events(Cursor::new(input), &LoadOptions::default()).unwrap();
        let ids: Vec<_> = outcome
            .records
            .iter()
            .map(|r| r.user_id.as_deref())
            .collect();
        assert_eq!(ids, vec![Some("u1"), Some(" u1 "), Some(" ")]);
    }

    #[test]
    fn fail_fast_rejects_bad_timestamp() {
        let input = "u1\t2009-05-04T13:00:00Z\ta\tA\tt\tT\nu1\tyesterday\ta\tA\tt\tT\n";
        let err = read_events(Cursor::new(input), &options(Leniency::FailFast)).unwrap_err();
        assert!(matches!(err, IoError::MalformedRow { line: 2, .. }));
        assert!(err.to_string().contains("invalid played_at: yesterday"));
    }

    #[test]
    fn fail_fast_rejects_wrong_column_count() {
        let input = "u1\t2009-05-04T13:00:00Z\ta\tA\n";
        let err = read_events(Cursor::new(input), &options(Leniency::FailFast)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed row on line 1: expected 6 columns, found 4"
        );
    }

    #[test]
    fn drop_malformed_counts_skipped_rows() {
        let input = "u1\t2009-05-04T13:00:00Z\ta\tA\tt\tT\nu1\tyesterday\ta\tA\tt\tT\nu2\t2009\n";
        let outcome = read_events(Cursor::new(input), &options(Leniency::DropMalformed)).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.dropped, 2);
    }

    #[test]
    fn permissive_nulls_unparsable_values() {
        let input = "u1\tyesterday\ta\tA\tt\tT\nu2\t2009-05-04T13:00:00Z\ta\n";
        let outcome = read_events(Cursor::new(input), &options(Leniency::Permissive)).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].played_at, None);
        assert_eq!(outcome.records[1].track_name, "");
    }

    #[test]
    fn load_events_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();

        let outcome = load_events(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(outcome.records.len(), 3);
    }

    #[test]
    fn load_events_reports_missing_file() {
        let err = load_events(Path::new("/nonexistent/plays.tsv"), &LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, IoError::Open { .. }));
    }

    #[test]
    fn parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2009, 5, 4, 13, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2009-05-04T13:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2009-05-04T15:00:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2009-05-04 13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2009-05-04T13:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("05/04/2009"), None);
    }

    #[test]
    fn leniency_parse() {
        assert_eq!("drop-malformed".parse::<Leniency>(), Ok(Leniency::DropMalformed));
        assert_eq!(Leniency::default().to_string(), "fail-fast");
    }
}
