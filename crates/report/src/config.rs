//! Report configuration via `executable-stories.toml`
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. `executable-stories.toml` in the project root, if present
//! 3. `EXECUTABLE_STORIES_OUTPUT` and `EXECUTABLE_STORIES_DISABLE`
//!
//! A config file that cannot be read or parsed is logged and ignored, so a
//! typo never costs a test run its exit code.

use crate::error::{ReportError, ReportResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use stories_core::{DEFAULT_OUTPUT_PATH, OUTPUT_ENV};
use tracing::warn;

/// Config file name looked up in the project root
pub const CONFIG_FILE_NAME: &str = "executable-stories.toml";

/// Environment variable that disables report emission when set to `1` or `true`
pub const DISABLE_ENV: &str = "EXECUTABLE_STORIES_DISABLE";

/// Read an environment variable, treating an empty value as absent
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Report configuration
///
/// # Example
///
/// ```toml
/// output = "target/stories/raw-run.json"
/// include_git = false
///
/// [meta]
/// team = "payments"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report path; relative paths are resolved against `project_root`
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Directory the run is reported for
    #[serde(skip)]
    pub project_root: PathBuf,
    /// Write a report at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Record the git SHA
    #[serde(default = "default_true")]
    pub include_git: bool,
    /// Record the CI environment
    #[serde(default = "default_true")]
    pub include_ci: bool,
    /// Run-level metadata copied into the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_true() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            project_root: PathBuf::from("."),
            enabled: true,
            include_git: true,
            include_ci: true,
            meta: None,
        }
    }
}

impl ReportConfig {
    /// Read and parse config from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if `output`
    /// is empty.
    pub fn from_file(path: &Path) -> ReportResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReportConfig = toml::from_str(&content)?;
        if config.output.as_os_str().is_empty() {
            return Err(ReportError::config(format!(
                "'output' in '{}' must not be empty",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Resolve config for the current directory and process environment
    pub fn resolve() -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve_from(&root, process_env)
    }

    /// Resolve config for `root` with an explicit environment lookup
    pub fn resolve_from<F>(root: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = root.join(CONFIG_FILE_NAME);
        let mut config = if path.is_file() {
            Self::from_file(&path).unwrap_or_else(|e| {
                warn!(
                    target: "stories::report",
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable config file"
                );
                Self::default()
            })
        } else {
            Self::default()
        };
        config.project_root = root.to_path_buf();

        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(output) = lookup(OUTPUT_ENV) {
            config.output = PathBuf::from(output);
        }
        if let Some(flag) = lookup(DISABLE_ENV) {
            if flag == "1" || flag.eq_ignore_ascii_case("true") {
                config.enabled = false;
            }
        }
        config
    }

    /// Absolute report path
    pub fn output_path(&self) -> PathBuf {
        if self.output.is_absolute() {
            self.output.clone()
        } else {
            self.project_root.join(&self.output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_writes_to_standard_location() {
        let config = ReportConfig::default();
        assert_eq!(config.output, PathBuf::from(".executable-stories/raw-run.json"));
        assert!(config.enabled);
        assert!(config.include_git);
        assert!(config.include_ci);
    }

    #[test]
    fn resolve_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ReportConfig::resolve_from(dir.path(), env(&[]));
        assert_eq!(config.project_root, dir.path());
        assert_eq!(
            config.output_path(),
            dir.path().join(".executable-stories/raw-run.json")
        );
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "output = \"reports/run.json\"\ninclude_git = false\n\n[meta]\nteam = \"payments\"\n",
        )
        .unwrap();

        let config = ReportConfig::resolve_from(dir.path(), env(&[]));
        assert_eq!(config.output_path(), dir.path().join("reports/run.json"));
        assert!(!config.include_git);
        assert!(config.include_ci);
        assert_eq!(config.meta.unwrap()["team"], "payments");
    }

    #[test]
    fn env_overrides_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "output = \"from-file.json\"\n").unwrap();

        let config = ReportConfig::resolve_from(
            dir.path(),
            env(&[(OUTPUT_ENV, "from-env.json"), (DISABLE_ENV, "1")]),
        );
        assert_eq!(config.output, PathBuf::from("from-env.json"));
        assert!(!config.enabled);
    }

    #[test]
    fn empty_env_counts_as_absent() {
        let dir = TempDir::new().unwrap();
        let config =
            ReportConfig::resolve_from(dir.path(), env(&[(OUTPUT_ENV, ""), (DISABLE_ENV, "")]));
        assert_eq!(config.output, default_output());
        assert!(config.enabled);
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "output = [not toml").unwrap();

        let config = ReportConfig::resolve_from(dir.path(), env(&[]));
        assert_eq!(config.output, default_output());
        assert!(config.enabled);
    }

    #[test]
    fn from_file_rejects_empty_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "output = \"\"\n").unwrap();
        assert!(matches!(
            ReportConfig::from_file(&path),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn absolute_output_is_kept() {
        let dir = TempDir::new().unwrap();
        let absolute = dir.path().join("elsewhere/run.json");
        let config = ReportConfig {
            output: absolute.clone(),
            project_root: PathBuf::from("/unrelated"),
            ..ReportConfig::default()
        };
        assert_eq!(config.output_path(), absolute);
    }
}
