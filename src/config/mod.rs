//! Pipeline configuration
//!
//! Defaults cover the stock towboot layout; a `towboot-ci.toml` next to the
//! checkout overrides them, and CLI flags override both. Every field has a
//! default, so a bare invocation in a towboot checkout just works.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default config filename looked up in the repo root
pub const CONFIG_FILE_NAME: &str = "towboot-ci.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Name of the binary the toolchain produces
    #[serde(default = "default_product")]
    pub product: String,

    /// Architectures to build, by short name
    #[serde(default = "default_arches")]
    pub arches: Vec<String>,

    /// Toolchain command to spawn per target
    #[serde(default = "default_toolchain_command")]
    pub toolchain_command: String,

    /// Wall-clock timeout per build, in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Maximum concurrent builds
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Where staged artifacts and the run summary land
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Where per-target build logs land
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Checkout to build and resolve the version in
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,

    /// `owner/repo` slug for the release store; inferred from the checkout
    /// when absent
    #[serde(default)]
    pub github_repo: Option<String>,
}

fn default_product() -> String {
    "towboot.efi".to_string()
}

fn default_arches() -> Vec<String> {
    vec!["i686".to_string(), "x86_64".to_string()]
}

fn default_toolchain_command() -> String {
    "cargo".to_string()
}

fn default_timeout_seconds() -> u64 {
    1800
}

fn default_jobs() -> usize {
    2
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("build-logs")
}

fn default_repo_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            arches: default_arches(),
            toolchain_command: default_toolchain_command(),
            timeout_seconds: default_timeout_seconds(),
            jobs: default_jobs(),
            artifact_dir: default_artifact_dir(),
            log_dir: default_log_dir(),
            repo_root: default_repo_root(),
            github_repo: None,
        }
    }
}

impl PipelineConfig {
    /// Load from an explicit path; the file must exist and parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve the effective config: an explicit `--config` path when given,
    /// otherwise `towboot-ci.toml` under `repo_root` when present, otherwise
    /// the defaults.
    pub fn resolve(explicit: Option<&Path>, repo_root: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let implicit = repo_root.join(CONFIG_FILE_NAME);
        if implicit.exists() {
            return Self::load(&implicit);
        }
        Ok(Self::default())
    }
}
