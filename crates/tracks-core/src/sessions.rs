//! Session aggregation, ranking and selection.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::segment::SessionEvent;
use crate::types::SessionKey;

/// Per-session aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub key: SessionKey,
    /// Number of plays in the session.
    pub track_count: usize,
    pub first_played_at: DateTime<Utc>,
    pub last_played_at: DateTime<Utc>,
}

/// A session with its 1-based position in the global ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedSession {
    pub rank: usize,
    #[serde(flatten)]
    pub summary: SessionSummary,
}

/// Count plays per `(user_id, session_id)`.
///
/// Summaries are returned in key order.
pub fn summarize_sessions(events: &[SessionEvent]) -> Vec<SessionSummary> {
    let mut sessions: BTreeMap<SessionKey, SessionSummary> = BTreeMap::new();

    for e in events {
        let played_at = e.event.played_at;
        sessions
            .entry(e.key())
            .and_modify(|s| {
                s.track_count += 1;
                s.first_played_at = s.first_played_at.min(played_at);
                s.last_played_at = s.last_played_at.max(played_at);
            })
            .or_insert_with(|| SessionSummary {
                key: e.key(),
                track_count: 1,
                first_played_at: played_at,
                last_played_at: played_at,
            });
    }

    sessions.into_values().collect()
}

/// Rank sessions by track count, most plays first.
///
/// Ranks are row numbers: equal counts get distinct consecutive ranks,
/// ordered by user id then session id.
pub fn rank_sessions(mut sessions: Vec<SessionSummary>) -> Vec<RankedSession> {
    sessions.sort_by(|a, b| {
        b.track_count
            .cmp(&a.track_count)
            .then_with(|| a.key.cmp(&b.key))
    });

    sessions
        .into_iter()
        .enumerate()
        .map(|(idx, summary)| RankedSession {
            rank: idx + 1,
            summary,
        })
        .collect()
}

/// Keep sessions ranked `1..=top_sessions`.
pub fn select_top_sessions(ranked: &[RankedSession], top_sessions: usize) -> Vec<RankedSession> {
    ranked
        .iter()
        .filter(|s| s.rank <= top_sessions)
        .cloned()
        .collect()
}

/// Keep the events belonging to one of `sessions`.
///
/// This is a semi-join: events are neither duplicated nor merged with session
/// columns.
pub fn events_in_sessions(events: &[SessionEvent], sessions: &[RankedSession]) -> Vec<SessionEvent> {
    let selected: HashSet<&SessionKey> = sessions.iter().map(|s| &s.summary.key).collect();

    events
        .iter()
        .filter(|e| selected.contains(&e.key()))
        .cloned()
        .collect()
}
