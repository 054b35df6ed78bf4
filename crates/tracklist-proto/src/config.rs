use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub playlists: PlaylistsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between playlist checks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

/// Where the external playout writes its rotated playlist snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistsConfig {
    #[serde(default = "default_playlists_dir")]
    pub dir: PathBuf,
    /// Only files whose name starts with this marker are playlists.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Current track for the stream encoder, overwritten on every change.
    #[serde(default = "default_now_playing_file")]
    pub now_playing_file: PathBuf,
    /// Text prepended to the track in chat and tweet messages.
    #[serde(default = "default_tweet_prefix_file")]
    pub tweet_prefix_file: PathBuf,
}

/// One downstream HTTP consumer. The encoded payload is appended to `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_chat")]
    pub chat: TargetConfig,
    #[serde(default = "default_graphics")]
    pub graphics: TargetConfig,
    #[serde(default = "default_tweet")]
    pub tweet: TargetConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for PlaylistsConfig {
    fn default() -> Self {
        Self {
            dir: default_playlists_dir(),
            file_prefix: default_file_prefix(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            now_playing_file: default_now_playing_file(),
            tweet_prefix_file: default_tweet_prefix_file(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            chat: default_chat(),
            graphics: default_graphics(),
            tweet: default_tweet(),
        }
    }
}

fn default_log_file() -> PathBuf {
    platform::data_dir().join("tracklist.log")
}

fn default_interval_secs() -> u64 {
    3
}

fn default_playlists_dir() -> PathBuf {
    PathBuf::from("/media/storage/tls/playlists")
}

fn default_file_prefix() -> String {
    "Playlist_".to_string()
}

fn default_now_playing_file() -> PathBuf {
    PathBuf::from("/media/storage/tls/songnp.txt")
}

fn default_tweet_prefix_file() -> PathBuf {
    PathBuf::from("/media/storage/tls/prefix.txt")
}

fn default_chat() -> TargetConfig {
    TargetConfig {
        enabled: true,
        url: "http://localhost/chatping.php?data=".to_string(),
    }
}

fn default_graphics() -> TargetConfig {
    TargetConfig {
        enabled: false,
        url: "http://localhost/graphics/update-track.php?song=".to_string(),
    }
}

fn default_tweet() -> TargetConfig {
    TargetConfig {
        enabled: true,
        url: String::new(),
    }
}

impl Config {
    /// Load from the default location, writing the defaults there on first run.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load an explicitly chosen file. A missing file is an error here.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    /// Tick period; never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            poll: PollConfig::default(),
            playlists: PlaylistsConfig::default(),
            output: OutputConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}
