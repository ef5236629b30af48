//! Stream path resolution.
//!
//! [`PathResolver`] maps a [`DeviceId`] to its DASH/HLS manifest URLs, its
//! RTMP ingest URL, and the directory and file-name pattern its extracted
//! frames are written to. Resolution is pure: the same device and
//! configuration always produce the same locations.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::StreamsConfig;
use crate::error::Result;
use crate::ids::DeviceId;
use crate::Error;

/// The kind of stream endpoint a location points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Dash,
    Hls,
    Rtmp,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [StreamKind::Dash, StreamKind::Hls, StreamKind::Rtmp];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Dash => "dash",
            StreamKind::Hls => "hls",
            StreamKind::Rtmp => "rtmp",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved stream endpoint (URL or filesystem path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct StreamLocation {
    pub kind: StreamKind,
    pub location: String,
}

impl StreamLocation {
    pub fn new(kind: StreamKind, location: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for StreamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// Where the frames of one device are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutputSpec {
    /// Output directory shared by all devices.
    pub directory: PathBuf,
    /// Transcoder file-name pattern, `<device>_%04d.jpg`.
    pub pattern: String,
    prefix: String,
}

impl FrameOutputSpec {
    /// Number of digits in the frame sequence number.
    const SEQUENCE_WIDTH: usize = 4;
    const EXTENSION: &'static str = "jpg";

    fn for_device(directory: PathBuf, device: DeviceId) -> Self {
        let prefix = format!("{device}_");
        let pattern = format!(
            "{prefix}%0{}d.{}",
            Self::SEQUENCE_WIDTH,
            Self::EXTENSION
        );
        Self {
            directory,
            pattern,
            prefix,
        }
    }

    /// File name of the `n`-th (1-based) frame, as the transcoder writes it.
    pub fn file_name(&self, n: u32) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            n,
            Self::EXTENSION,
            width = Self::SEQUENCE_WIDTH
        )
    }

    /// Full path of the `n`-th (1-based) frame.
    pub fn file_path(&self, n: u32) -> PathBuf {
        self.directory.join(self.file_name(n))
    }

    /// `directory/pattern`, the output argument handed to the transcoder.
    pub fn output_template(&self) -> PathBuf {
        self.directory.join(&self.pattern)
    }
}

/// Resolves device stream locations from the configured bases.
#[derive(Debug, Clone)]
pub struct PathResolver {
    manifest_base_url: String,
    rtmp_base_url: String,
    dash_manifest: String,
    hls_manifest: String,
    frames_dir: PathBuf,
    frames_base_url: String,
}

impl PathResolver {
    /// Build a resolver, rejecting configurations that cannot yield usable
    /// locations. Call once at start-up.
    pub fn new(config: &StreamsConfig) -> Result<Self> {
        let manifest_base_url = trimmed_base("streams.manifest_base_url", &config.manifest_base_url)?;
        let rtmp_base_url = trimmed_base("streams.rtmp_base_url", &config.rtmp_base_url)?;
        let dash_manifest = manifest_name("streams.dash_manifest", &config.dash_manifest)?;
        let hls_manifest = manifest_name("streams.hls_manifest", &config.hls_manifest)?;

        if config.frames_dir.as_os_str().is_empty() {
            return Err(Error::Config("streams.frames_dir is empty".into()));
        }
        // The transcoder receives the output template as a UTF-8 argument.
        if config.frames_dir.to_str().is_none() {
            return Err(Error::Config(format!(
                "streams.frames_dir is not valid UTF-8: {}",
                config.frames_dir.display()
            )));
        }

        Ok(Self {
            manifest_base_url,
            rtmp_base_url,
            dash_manifest,
            hls_manifest,
            frames_dir: config.frames_dir.clone(),
            // An empty prefix is allowed and yields bare file names.
            frames_base_url: config.frames_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve the location of `kind` for `device`.
    pub fn resolve(&self, device: DeviceId, kind: StreamKind) -> StreamLocation {
        let location = match kind {
            StreamKind::Dash => self.manifest_url(device, &self.dash_manifest),
            StreamKind::Hls => self.manifest_url(device, &self.hls_manifest),
            StreamKind::Rtmp => format!("{}/{device}", self.rtmp_base_url),
        };
        StreamLocation::new(kind, location)
    }

    /// Output directory and file-name pattern for `device`'s frames.
    pub fn frame_output_spec(&self, device: DeviceId) -> FrameOutputSpec {
        FrameOutputSpec::for_device(self.frames_dir.clone(), device)
    }

    /// Client-facing URI of a frame file.
    pub fn frame_uri(&self, file_name: &str) -> String {
        if self.frames_base_url.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{file_name}", self.frames_base_url)
        }
    }

    pub fn frames_dir(&self) -> &PathBuf {
        &self.frames_dir
    }

    fn manifest_url(&self, device: DeviceId, file: &str) -> String {
        format!("{}/stream/{device}/{file}", self.manifest_base_url)
    }
}

fn trimmed_base(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(Error::Config(format!("{field} is empty")));
    }
    Ok(trimmed.to_string())
}

fn manifest_name(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() || value.contains('/') || value.contains('\\') {
        return Err(Error::Config(format!(
            "{field} must be a plain file name, got {value:?}"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE: &str = "11111111-1111-1111-1111-111111111111";

    fn config() -> StreamsConfig {
        StreamsConfig {
            manifest_base_url: "https://base/".into(),
            rtmp_base_url: "rtmp://ingest:1935/live".into(),
            frames_dir: PathBuf::from("/var/frames"),
            frames_base_url: "https://base/frames/".into(),
            ..StreamsConfig::default()
        }
    }

    fn device() -> DeviceId {
        DEVICE.parse().unwrap()
    }

    #[test]
    fn resolves_all_kinds() {
        let resolver = PathResolver::new(&config()).unwrap();
        assert_eq!(
            resolver.resolve(device(), StreamKind::Dash).location,
            format!("https://base/stream/{DEVICE}/dash.mpd")
        );
        assert_eq!(
            resolver.resolve(device(), StreamKind::Hls).location,
            format!("https://base/stream/{DEVICE}/index.m3u8")
        );
        assert_eq!(
            resolver.resolve(device(), StreamKind::Rtmp).location,
            format!("rtmp://ingest:1935/live/{DEVICE}")
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = PathResolver::new(&config()).unwrap();
        let b = PathResolver::new(&config()).unwrap();
        for _ in 0..16 {
            let id = DeviceId::new_random();
            for kind in StreamKind::ALL {
                assert_eq!(a.resolve(id, kind), a.resolve(id, kind));
                assert_eq!(a.resolve(id, kind), b.resolve(id, kind));
            }
            assert_eq!(a.frame_output_spec(id), b.frame_output_spec(id));
        }
    }

    #[test]
    fn frame_spec_is_per_device() {
        let resolver = PathResolver::new(&config()).unwrap();
        let output = resolver.frame_output_spec(device());
        assert_eq!(output.directory, PathBuf::from("/var/frames"));
        assert_eq!(output.pattern, format!("{DEVICE}_%04d.jpg"));
        assert_eq!(output.file_name(1), format!("{DEVICE}_0001.jpg"));
        assert_eq!(output.file_name(12), format!("{DEVICE}_0012.jpg"));
        assert_eq!(
            output.output_template(),
            PathBuf::from(format!("/var/frames/{DEVICE}_%04d.jpg"))
        );

        let other = resolver.frame_output_spec(DeviceId::new_random());
        assert_ne!(output.pattern, other.pattern);
    }

    #[test]
    fn frame_uri_joins_base() {
        let resolver = PathResolver::new(&config()).unwrap();
        assert_eq!(
            resolver.frame_uri("a_0001.jpg"),
            "https://base/frames/a_0001.jpg"
        );

        let mut cfg = config();
        cfg.frames_base_url = String::new();
        let resolver = PathResolver::new(&cfg).unwrap();
        assert_eq!(resolver.frame_uri("a_0001.jpg"), "a_0001.jpg");
    }

    #[test]
    fn empty_bases_are_config_errors() {
        let mut cfg = config();
        cfg.manifest_base_url = "  ".into();
        assert!(matches!(PathResolver::new(&cfg), Err(Error::Config(_))));

        let mut cfg = config();
        cfg.rtmp_base_url = "/".into();
        assert!(matches!(PathResolver::new(&cfg), Err(Error::Config(_))));

        let mut cfg = config();
        cfg.frames_dir = PathBuf::new();
        assert!(matches!(PathResolver::new(&cfg), Err(Error::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_frames_dir_is_config_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut cfg = config();
        cfg.frames_dir = PathBuf::from(OsStr::from_bytes(b"/var/fr\xffmes"));
        assert!(matches!(PathResolver::new(&cfg), Err(Error::Config(_))));
    }

    #[test]
    fn manifest_names_cannot_escape_stream_dir() {
        let mut cfg = config();
        cfg.dash_manifest = "../other/dash.mpd".into();
        assert!(matches!(PathResolver::new(&cfg), Err(Error::Config(_))));
    }

    #[test]
    fn default_config_resolves() {
        assert!(PathResolver::new(&StreamsConfig::default()).is_ok());
    }
}
