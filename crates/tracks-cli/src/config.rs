//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracks_core::MetadataPolicy;
use tracks_io::Leniency;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Number of tracks to report.
    pub top_tracks_number: usize,
    /// Number of sessions to consider.
    pub top_sessions_number: usize,
    /// Minutes between plays after which a new session starts.
    pub session_gap_minutes: u32,
    pub leniency: Leniency,
    pub metadata_policy: MetadataPolicy,
    pub include_play_count: bool,
    /// Where reports go when no output path is given.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            top_tracks_number: 10,
            top_sessions_number: 50,
            session_gap_minutes: 20,
            leniency: Leniency::default(),
            metadata_policy: MetadataPolicy::default(),
            include_play_count: false,
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (TOP_TRACKS_*)
        figment = figment.merge(Env::prefixed("TOP_TRACKS_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for top-tracks.
///
/// On Linux: `~/.config/top-tracks`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("top-tracks"))
}
