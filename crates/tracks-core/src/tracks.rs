//! Track play counts, top-N selection and metadata resolution.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{Playable, TrackMetadata};

/// How to resolve a track id seen with more than one artist/title variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataPolicy {
    /// One row per track: the most played variant, ties to the smallest.
    #[default]
    Canonical,
    /// One row per distinct variant.
    AllVariants,
}

impl MetadataPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::AllVariants => "all-variants",
        }
    }
}

impl fmt::Display for MetadataPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetadataPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonical" => Ok(Self::Canonical),
            "all-variants" => Ok(Self::AllVariants),
            _ => Err(format!("invalid metadata policy: {s}")),
        }
    }
}

/// Number of plays of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCount {
    pub track_id: String,
    pub play_count: usize,
}

/// A selected track with its descriptive fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopTrack {
    pub track_id: String,
    pub artist_id: String,
    pub artist_name: String,
    pub track_name: String,
    pub play_count: usize,
}

/// Count plays per track id, in track id order.
pub fn count_tracks<E: Playable>(events: &[E]) -> Vec<TrackCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for e in events {
        *counts.entry(e.play().track_id.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(track_id, play_count)| TrackCount {
            track_id: track_id.to_string(),
            play_count,
        })
        .collect()
}

/// Keep the `top_tracks` most played tracks; equal counts order by track id.
pub fn top_tracks(mut counts: Vec<TrackCount>, top_tracks: usize) -> Vec<TrackCount> {
    counts.sort_by(|a, b| {
        b.play_count
            .cmp(&a.play_count)
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
    counts.truncate(top_tracks);
    counts
}

/// Attach artist and title to each selected track, keeping the ranked order.
pub fn attach_metadata<E: Playable>(
    top: &[TrackCount],
    events: &[E],
    policy: MetadataPolicy,
) -> Vec<TopTrack> {
    let mut variants: HashMap<&str, BTreeMap<TrackMetadata, usize>> = top
        .iter()
        .map(|t| (t.track_id.as_str(), BTreeMap::new()))
        .collect();

    for e in events {
        let play = e.play();
        if let Some(seen) = variants.get_mut(play.track_id.as_str()) {
            *seen.entry(play.metadata()).or_default() += 1;
        }
    }

    let mut tracks = Vec::with_capacity(top.len());
    for track in top {
        let Some(seen) = variants.get(track.track_id.as_str()) else {
            continue;
        };

        if seen.len() > 1 {
            tracing::warn!(
                track_id = %track.track_id,
                variants = seen.len(),
                policy = %policy,
                "track id has conflicting metadata"
            );
        }

        let chosen: Vec<&TrackMetadata> = match policy {
            MetadataPolicy::Canonical => seen
                .iter()
                .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then_with(|| b.cmp(a)))
                .map(|(metadata, _)| metadata)
                .into_iter()
                .collect(),
            MetadataPolicy::AllVariants => seen.keys().collect(),
        };

        tracks.extend(chosen.into_iter().map(|metadata| TopTrack {
            track_id: track.track_id.clone(),
            artist_id: metadata.artist_id.clone(),
            artist_name: metadata.artist_name.clone(),
            track_name: metadata.track_name.clone(),
            play_count: track.play_count,
        }));
    }

    tracks
}
