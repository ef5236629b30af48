//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, stream locations, frame extraction, probing,
//! the device registry, and external tools. Every section defaults sensibly
//! so a completely empty `{}` file is valid.
//!
//! Configuration is read once at start-up and is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::ids::DeviceId;
use crate::Error;

/// Locations searched by [`Config::discover`] when no explicit path is given.
const DEFAULT_PATHS: &[&str] = &[
    "./devstream.json",
    "~/.config/devstream/config.json",
    "/etc/devstream/config.json",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub streams: StreamsConfig,
    pub frames: FramesConfig,
    pub probe: ProbeConfig,
    pub registry: RegistryConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Load configuration from a file, failing if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load from the explicit path if given, otherwise from the first default
    /// location that exists, otherwise return defaults.
    pub fn discover(custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }

        for path_str in DEFAULT_PATHS {
            let expanded = shellexpand::tilde(path_str);
            let path = Path::new(expanded.as_ref());
            if path.exists() {
                tracing::info!("Using config file {}", path.display());
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    ///
    /// Fatal problems with stream locations are reported by
    /// [`crate::PathResolver::new`] instead.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.frames.timeout_secs == 0 {
            warnings.push("frames.timeout_secs is 0; every extraction will time out".into());
        }

        if self.frames.max_concurrent == 0 {
            warnings.push("frames.max_concurrent is 0; treating it as 1".into());
        }

        if self.frames.max_count == 0 {
            warnings.push("frames.max_count is 0; every frame request will be rejected".into());
        }

        if self.probe.timeout_secs == 0 {
            warnings.push("probe.timeout_secs is 0; manifest probes will always fail".into());
        }

        if self.registry.base_url.is_none() && self.registry.devices.is_empty() {
            warnings.push(
                "registry has neither base_url nor static devices; no device will ever stream"
                    .into(),
            );
        }

        if let Some(ref ffmpeg) = self.tools.ffmpeg_path {
            if !ffmpeg.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; falling back to PATH",
                    ffmpeg.display()
                ));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single request. Dropping a timed-out request also
    /// kills any transcoder it started.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout_secs: 120,
        }
    }
}

/// Where a device's streams live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamsConfig {
    /// Base URL of the upstream streaming server that publishes manifests.
    pub manifest_base_url: String,
    /// Base URL of the RTMP ingest; the device id is appended as the stream key.
    pub rtmp_base_url: String,
    /// DASH manifest file name inside a device's stream directory.
    pub dash_manifest: String,
    /// HLS manifest file name inside a device's stream directory.
    pub hls_manifest: String,
    /// Directory the transcoder writes extracted frames into.
    pub frames_dir: PathBuf,
    /// URL prefix under which `frames_dir` is reachable by clients.
    pub frames_base_url: String,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            manifest_base_url: "http://localhost:8080".into(),
            rtmp_base_url: "rtmp://localhost:1935/live".into(),
            dash_manifest: "dash.mpd".into(),
            hls_manifest: "index.m3u8".into(),
            frames_dir: PathBuf::from("./data/frames"),
            frames_base_url: "/frames".into(),
        }
    }
}

/// Frame extraction limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    /// Maximum wall-clock time for one transcoder run.
    pub timeout_secs: u64,
    /// Time between SIGTERM and SIGKILL when a run times out.
    pub kill_grace_millis: u64,
    /// Largest frame count a single request may ask for.
    pub max_count: u32,
    /// Maximum number of transcoder processes running at once.
    pub max_concurrent: usize,
}

impl FramesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_millis)
    }
}

impl Default for FramesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            kill_grace_millis: 2000,
            max_count: 100,
            max_concurrent: 4,
        }
    }
}

/// Manifest existence probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub timeout_secs: u64,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_secs: 5 }
    }
}

/// Device registry connection.
///
/// With `base_url` set the registry is queried over HTTP; otherwise the
/// statically configured `devices` are used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub devices: Vec<RegistryDevice>,
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 5,
            devices: Vec::new(),
        }
    }
}

/// A device known to the static registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryDevice {
    pub id: DeviceId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub streaming: bool,
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}
