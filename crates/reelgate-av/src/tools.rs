//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools reelgate shells out to (ffmpeg, ffprobe). Discovery happens
//! once at startup: a configured path wins when it exists, otherwise the
//! tool is looked up in `PATH`. Tools that cannot be found are omitted
//! from the registry and surface as errors only when actually required.

use std::collections::HashMap;
use std::path::PathBuf;

use reelgate_common::{Error, Result};

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Explicit tool path overrides, typically sourced from configuration.
#[derive(Debug, Clone, Default)]
pub struct ToolPaths {
    /// Explicit path to the ffmpeg executable.
    pub ffmpeg: Option<PathBuf>,
    /// Explicit path to the ffprobe executable.
    pub ffprobe: Option<PathBuf>,
}

/// Configuration for a single discovered tool.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if [`ToolPaths`] supplies a custom path **and**
    /// that path exists, it is used directly. Otherwise [`which::which`]
    /// locates the tool in `PATH`. Tools that are not found are silently
    /// omitted from the registry.
    pub fn discover(paths: &ToolPaths) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => paths.ffmpeg.as_deref(),
                "ffprobe" => paths.ffprobe.as_deref(),
                _ => None,
            };

            let resolved = if let Some(p) = custom_path {
                if p.exists() {
                    Some(p.to_path_buf())
                } else {
                    // Custom path does not exist; fall back to PATH.
                    which::which(name).ok()
                }
            } else {
                which::which(name).ok()
            };

            if let Some(path) = resolved {
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                    },
                );
            }
        }

        Self { tools }
    }

    /// A registry with no tools registered.
    ///
    /// Every [`require`](Self::require) call fails, which exercises the
    /// direct-streaming fallback paths.
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Return the [`ToolConfig`] for the given tool, or
    /// [`Error::ToolNotFound`] if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> Result<&ToolConfig> {
        self.tools
            .get(name)
            .ok_or_else(|| Error::tool_not_found(name))
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| {
                if let Some(cfg) = self.tools.get(name) {
                    let version = detect_version(&cfg.path);
                    ToolInfo {
                        name: name.to_string(),
                        available: true,
                        version,
                        path: Some(cfg.path.clone()),
                    }
                } else {
                    ToolInfo {
                        name: name.to_string(),
                        available: false,
                        version: None,
                        path: None,
                    }
                }
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &PathBuf) -> Option<String> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_paths() {
        let registry = ToolRegistry::discover(&ToolPaths::default());
        // We cannot guarantee any tool is installed in CI,
        // but the call itself must not panic.
        let _ = registry.check_all();
    }

    #[test]
    fn empty_registry_requires_nothing() {
        let registry = ToolRegistry::empty();
        assert!(registry.require("ffmpeg").is_err());
        assert!(registry.require("ffprobe").is_err());
    }

    #[test]
    fn require_missing_tool_returns_tool_not_found() {
        let registry = ToolRegistry::empty();
        let err = registry.require("ffmpeg").unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[test]
    fn nonexistent_custom_path_falls_back() {
        let paths = ToolPaths {
            ffmpeg: Some(PathBuf::from("/nonexistent/ffmpeg-xyz")),
            ffprobe: None,
        };
        // Must not panic; either PATH has ffmpeg or the registry omits it.
        let registry = ToolRegistry::discover(&paths);
        let _ = registry.check_all();
    }

    #[test]
    fn check_all_returns_known_tools() {
        let registry = ToolRegistry::empty();
        let infos = registry.check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"ffmpeg"));
        assert!(names.contains(&"ffprobe"));
        assert!(infos.iter().all(|i| !i.available));
    }
}
