//! Session inference.
//!
//! Splits each user's listening history into sessions:
//! 1. Partition events by user and order them by `played_at`
//! 2. Annotate each event with the gap since the user's previous play
//! 3. A gap strictly greater than the threshold opens a new session
//! 4. Session ids are the running count of session openings, starting at 0

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use rayon::prelude::*;

use crate::event::{PlayEvent, Playable};
use crate::types::{SessionKey, UserId};

/// Configuration for session inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// A play more than this long after the previous one starts a new
    /// session. Compared at full timestamp precision. Default: 20 min.
    pub gap_threshold: TimeDelta,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_minutes(20)
    }
}

impl SessionConfig {
    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            gap_threshold: TimeDelta::minutes(i64::from(minutes)),
        }
    }
}

/// A play event annotated with the gap to the user's previous play.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub event: PlayEvent,
    /// Minutes since the previous play of the same user; `None` for the first.
    pub gap_minutes: Option<f64>,
    pub is_new_session: bool,
}

impl Playable for TimedEvent {
    fn play(&self) -> &PlayEvent {
        &self.event
    }
}

/// A play event assigned to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    pub event: PlayEvent,
    pub gap_minutes: Option<f64>,
    pub is_new_session: bool,
    pub session_id: u32,
}

impl SessionEvent {
    pub fn key(&self) -> SessionKey {
        SessionKey {
            user_id: self.event.user_id.clone(),
            session_id: self.session_id,
        }
    }
}

impl Playable for SessionEvent {
    fn play(&self) -> &PlayEvent {
        &self.event
    }
}

/// Groups events by user (ascending) and orders each group by `played_at`.
///
/// The sort is stable: plays sharing a timestamp keep their input order.
fn partition_by_user<E: Playable>(events: &[E]) -> Vec<Vec<&E>> {
    let mut groups: BTreeMap<&UserId, Vec<&E>> = BTreeMap::new();
    for event in events {
        groups.entry(&event.play().user_id).or_default().push(event);
    }

    groups
        .into_values()
        .map(|mut group| {
            group.sort_by_key(|e| e.play().played_at);
            group
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn gap_minutes(gap: TimeDelta) -> f64 {
    (gap.num_seconds() as f64 + f64::from(gap.subsec_nanos()) / 1e9) / 60.0
}

/// Annotate every event with its gap and session-boundary flag.
///
/// The annotation depends only on `user_id`, `played_at` and input order, so
/// applying it to its own output yields the same records.
pub fn annotate_gaps<E: Playable + Sync>(events: &[E], config: &SessionConfig) -> Vec<TimedEvent> {
    let partitions = partition_by_user(events);

    let annotated: Vec<Vec<TimedEvent>> = partitions
        .par_iter()
        .map(|group| {
            let mut previous: Option<DateTime<Utc>> = None;
            group
                .iter()
                .map(|e| {
                    let event = e.play();
                    let gap = previous.map(|prev| event.played_at - prev);
                    previous = Some(event.played_at);
                    TimedEvent {
                        event: event.clone(),
                        gap_minutes: gap.map(gap_minutes),
                        is_new_session: gap.is_some_and(|gap| gap > config.gap_threshold),
                    }
                })
                .collect()
        })
        .collect();

    annotated.into_iter().flatten().collect()
}

/// Assign per-user session ids as the inclusive running sum of boundary flags.
pub fn assign_session_ids(events: &[TimedEvent]) -> Vec<SessionEvent> {
    let partitions = partition_by_user(events);

    let segmented: Vec<Vec<SessionEvent>> = partitions
        .par_iter()
        .map(|group| {
            let mut session_id = 0u32;
            group
                .iter()
                .map(|timed| {
                    if timed.is_new_session {
                        session_id += 1;
                    }
                    SessionEvent {
                        event: timed.event.clone(),
                        gap_minutes: timed.gap_minutes,
                        is_new_session: timed.is_new_session,
                        session_id,
                    }
                })
                .collect()
        })
        .collect();

    segmented.into_iter().flatten().collect()
}

/// Run both annotation stages.
pub fn segment_sessions<E: Playable + Sync>(
    events: &[E],
    config: &SessionConfig,
) -> Vec<SessionEvent> {
    let timed = annotate_gaps(events, config);
    let boundaries = timed.iter().filter(|e| e.is_new_session).count();
    tracing::debug!(events = timed.len(), boundaries, "annotated play gaps");
    assign_session_ids(&timed)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{BTreeSet, HashMap};

    use chrono::{Duration, TimeZone};

    fn ts_ms(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2009, 5, 4, 13, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn ts(minutes: i64) -> DateTime<Utc> {
        ts_ms(minutes * 60_000)
    }

    fn play(line: usize, user: &str, played_at: DateTime<Utc>) -> PlayEvent {
        PlayEvent {
            line,
            user_id: UserId::new(user).unwrap(),
            played_at,
            artist_id: format!("art-{line}"),
            artist_name: format!("Artist {line}"),
            track_id: format!("tr-{line}"),
            track_name: format!("Track {line}"),
        }
    }

    fn sessions_of(events: &[SessionEvent], user: &str) -> Vec<u32> {
        events
            .iter()
            .filter(|e| e.event.user_id.as_str() == user)
            .map(|e| e.session_id)
            .collect()
    }

    #[test]
    fn test_three_user_scenario() {
        let events = vec![
            play(1, "A", ts(0)),
            play(2, "A", ts(5)),
            play(3, "A", ts(30)),
            play(4, "B", ts(0)),
            play(5, "C", ts(0)),
            play(6, "C", ts(10)),
        ];

        let segmented = segment_sessions(&events, &SessionConfig::default());

        assert_eq!(sessions_of(&segmented, "A"), vec![0, 0, 1]);
        assert_eq!(sessions_of(&segmented, "B"), vec![0]);
        assert_eq!(sessions_of(&segmented, "C"), vec![0, 0]);

        let a_gaps: Vec<_> = segmented
            .iter()
            .filter(|e| e.event.user_id.as_str() == "A")
            .map(|e| e.gap_minutes)
            .collect();
        assert_eq!(a_gaps, vec![None, Some(5.0), Some(25.0)]);
    }

    #[test]
    fn test_gap_threshold_is_strict() {
        let events = vec![
            play(1, "u", ts(0)),
            play(2, "u", ts(20)),
            play(3, "u", ts_ms(40 * 60_000 + 6)),
        ];

        let timed = annotate_gaps(&events, &SessionConfig::default());

        // exactly 20 minutes stays in the session
        assert!(!timed[1].is_new_session);
        // 20.0001 minutes splits
        assert!(timed[2].is_new_session);
        assert!(timed[2].gap_minutes.unwrap() > 20.0);

        let segmented = assign_session_ids(&timed);
        assert_eq!(sessions_of(&segmented, "u"), vec![0, 0, 1]);
    }

    #[test]
    fn test_sub_millisecond_gap_over_threshold_splits() {
        let events = vec![
            play(1, "u", ts(0)),
            play(2, "u", ts(20) + Duration::microseconds(500)),
            play(3, "u", ts(40) + Duration::microseconds(500)),
        ];

        let timed = annotate_gaps(&events, &SessionConfig::default());

        assert!(timed[1].is_new_session);
        assert!(timed[1].gap_minutes.unwrap() > 20.0);
        // exactly 20 minutes, fractional seconds included, stays
        assert!(!timed[2].is_new_session);
        assert_eq!(timed[2].gap_minutes, Some(20.0));
    }

    #[test]
    fn test_first_event_has_no_gap_and_no_flag() {
        let events = vec![play(1, "u", ts(0))];
        let timed = annotate_gaps(&events, &SessionConfig::default());
        assert_eq!(timed[0].gap_minutes, None);
        assert!(!timed[0].is_new_session);
    }

    #[test]
    fn test_unsorted_input_is_ordered_by_time() {
        let events = vec![
            play(1, "u", ts(100)),
            play(2, "u", ts(0)),
            play(3, "u", ts(50)),
            play(4, "u", ts(10)),
        ];

        let segmented = segment_sessions(&events, &SessionConfig::default());
        let lines: Vec<_> = segmented.iter().map(|e| e.event.line).collect();
        assert_eq!(lines, vec![2, 4, 3, 1]);
        assert_eq!(sessions_of(&segmented, "u"), vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_equal_timestamps_keep_input_order() {
        let events = vec![
            play(1, "u", ts(5)),
            play(2, "u", ts(5)),
            play(3, "u", ts(5)),
        ];
        let segmented = segment_sessions(&events, &SessionConfig::default());
        let lines: Vec<_> = segmented.iter().map(|e| e.event.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert_eq!(sessions_of(&segmented, "u"), vec![0, 0, 0]);
    }

    #[test]
    fn test_session_ids_are_dense_and_monotonic() {
        let minutes = [0, 3, 40, 41, 100, 200, 215, 236, 500];
        let events: Vec<_> = minutes
            .iter()
            .enumerate()
            .flat_map(|(i, &m)| {
                [
                    play(i * 2 + 1, "x", ts(m)),
                    play(i * 2 + 2, "y", ts(m * 2)),
                ]
            })
            .collect();

        let segmented = segment_sessions(&events, &SessionConfig::default());

        for user in ["x", "y"] {
            let ids = sessions_of(&segmented, user);
            assert!(ids.windows(2).all(|w| w[1] == w[0] || w[1] == w[0] + 1));
            let distinct: BTreeSet<_> = ids.iter().copied().collect();
            let max = *ids.last().unwrap();
            assert_eq!(distinct, (0..=max).collect::<BTreeSet<_>>());
        }
    }

    #[test]
    fn test_every_event_lands_in_one_session() {
        let events = vec![
            play(1, "a", ts(0)),
            play(2, "b", ts(1)),
            play(3, "a", ts(90)),
            play(4, "b", ts(2)),
        ];

        let segmented = segment_sessions(&events, &SessionConfig::default());
        assert_eq!(segmented.len(), events.len());

        let mut by_line: HashMap<usize, usize> = HashMap::new();
        for e in &segmented {
            *by_line.entry(e.event.line).or_default() += 1;
        }
        assert!(by_line.values().all(|&n| n == 1));
        assert_eq!(by_line.len(), events.len());
    }

    #[test]
    fn test_annotation_is_idempotent() {
        let events = vec![
            play(1, "a", ts(0)),
            play(2, "a", ts(30)),
            play(3, "b", ts(7)),
            play(4, "a", ts(31)),
            play(5, "b", ts(7)),
        ];
        let config = SessionConfig::default();

        let once = annotate_gaps(&events, &config);
        let twice = annotate_gaps(&once, &config);
        assert_eq!(once, twice);

        let segmented = assign_session_ids(&once);
        let resegmented = segment_sessions(&segmented, &config);
        assert_eq!(segmented, resegmented);
    }

    #[test]
    fn test_custom_threshold() {
        let events = vec![play(1, "u", ts(0)), play(2, "u", ts(6))];
        let segmented = segment_sessions(&events, &SessionConfig::from_minutes(5));
        assert_eq!(sessions_of(&segmented, "u"), vec![0, 1]);
    }

    #[test]
    fn test_empty_events() {
        let events: Vec<PlayEvent> = vec![];
        assert!(segment_sessions(&events, &SessionConfig::default()).is_empty());
    }
}
