use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use reelgate_av::{QualityProfile, ToolPaths};
use reelgate_common::PathMapping;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub transcoding: TranscodingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Enable authentication for the streaming API
    #[serde(default)]
    pub enabled: bool,

    /// API key for programmatic access (used with Authorization: Bearer header)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Username for web UI login
    #[serde(default)]
    pub username: Option<String>,

    /// Bcrypt hash of the password (generate with `reelgate hash-password`)
    #[serde(default)]
    pub password_hash: Option<String>,

    /// Session timeout in hours (default: 24)
    #[serde(default = "default_session_timeout")]
    pub session_timeout_hours: u64,
}

fn default_session_timeout() -> u64 {
    24
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            username: None,
            password_hash: None,
            session_timeout_hours: default_session_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: AuthConfig::default(),
        }
    }
}

/// Library directories media may be served from.
///
/// The download managers address media under the virtual prefixes
/// `/movies` and `/tv`; each configured directory doubles as an allowed
/// root. With neither path configured, streaming is unrestricted (an
/// explicit policy for not-yet-configured setups).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Real directory the `/movies` prefix maps to.
    #[serde(default)]
    pub movies_path: Option<PathBuf>,

    /// Real directory the `/tv` prefix maps to.
    #[serde(default)]
    pub tv_path: Option<PathBuf>,
}

impl StorageConfig {
    /// The allow-listed roots path resolution must stay under.
    pub fn allowed_roots(&self) -> Vec<PathBuf> {
        [&self.movies_path, &self.tv_path]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Virtual-prefix remaps applied before resolution.
    pub fn mappings(&self) -> Vec<PathMapping> {
        let mut mappings = Vec::new();
        if let Some(ref movies) = self.movies_path {
            mappings.push(PathMapping::new("/movies", movies.clone()));
        }
        if let Some(ref tv) = self.tv_path {
            mappings.push(PathMapping::new("/tv", tv.clone()));
        }
        mappings
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodingConfig {
    /// Enable on-demand transcoding (default: true). When disabled, every
    /// request streams the original file.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Quality served when a request asks for `auto` (default: 720p).
    #[serde(default = "default_quality")]
    pub default_quality: QualityProfile,

    /// Directory renditions are cached in.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Maximum encoder run time in seconds (default: 4 hours). Encodes
    /// exceeding this are killed and treated as failed.
    #[serde(default = "default_encode_timeout")]
    pub encode_timeout_secs: u64,

    /// Explicit path to the ffmpeg executable. Falls back to a PATH
    /// lookup when unset or missing.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit path to the ffprobe executable.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_quality() -> QualityProfile {
    QualityProfile::P720
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./transcode-cache")
}

fn default_encode_timeout() -> u64 {
    4 * 3600
}

impl Default for TranscodingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            default_quality: default_quality(),
            cache_dir: default_cache_dir(),
            encode_timeout_secs: default_encode_timeout(),
            ffmpeg_path: None,
            ffprobe_path: None,
        }
    }
}

impl TranscodingConfig {
    /// Tool path overrides for encoder discovery.
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            ffmpeg: self.ffmpeg_path.clone(),
            ffprobe: self.ffprobe_path.clone(),
        }
    }

    /// The encode timeout as a [`Duration`].
    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }
}
