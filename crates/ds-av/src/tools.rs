//! External tool detection.
//!
//! The [`ToolRegistry`] locates the transcoder (ffmpeg) once at start-up and
//! reports its availability for `check-tools` and the admin API.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Name of the transcoder binary.
pub const FFMPEG: &str = "ffmpeg";

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &[FFMPEG];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    #[schema(value_type = Option<String>)]
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// A configured path is used when it exists; otherwise [`which::which`]
    /// searches `PATH`. Tools that are not found are omitted.
    pub fn discover(tools_config: &ds_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                FFMPEG => tools_config.ffmpeg_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                // Custom path missing or unset; fall back to PATH.
                _ => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Path of a discovered tool, or an [`ds_core::Error::Tool`] if the tool
    /// was not found during discovery.
    pub fn require(&self, name: &str) -> ds_core::Result<&Path> {
        self.tools
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                ds_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
            })
    }

    /// Path to run the transcoder with.
    ///
    /// Falls back to the bare program name when discovery failed, so that a
    /// missing binary surfaces as a spawn failure on use rather than at
    /// start-up.
    pub fn ffmpeg(&self) -> PathBuf {
        self.tools
            .get(FFMPEG)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(FFMPEG))
    }

    /// Check all known tools and return availability information.
    ///
    /// Runs each tool's version command synchronously.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
