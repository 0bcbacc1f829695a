//! Release publication
//!
//! Tag-triggered runs attach their staged artifacts to a release named after
//! the tag. Publication is idempotent: re-running the same tag reuses the
//! existing release and overwrites assets with the same filename, so a
//! re-triggered run converges to the same final state instead of failing.
//!
//! Upload failures are tolerated per artifact. A release that ends up with
//! only part of its artifacts is reported as degraded, never as a silent
//! success.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::artifact::Artifact;
use crate::summary::PublishState;

/// Errors from release store operations
#[derive(Debug, Error)]
pub enum PublishError {
    /// The store CLI could not be spawned
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The store rejected creating or querying the release
    #[error("release store rejected {tag}: {detail}")]
    StoreRejected { tag: String, detail: String },

    /// One asset upload failed
    #[error("upload of {filename} failed: {detail}")]
    UploadFailed { filename: String, detail: String },
}

/// A place releases and their assets live.
///
/// The production implementation drives the `gh` CLI; tests substitute an
/// in-memory mock.
pub trait ReleaseStore {
    /// Whether a release for `tag` already exists.
    fn release_exists(&self, tag: &str) -> Result<bool, PublishError>;

    /// Create the release for `tag`. Not called when it already exists.
    fn create_release(&self, tag: &str) -> Result<(), PublishError>;

    /// Attach one asset, replacing any existing asset with the same name.
    fn upload(&self, tag: &str, path: &Path, filename: &str) -> Result<(), PublishError>;
}

/// What publication achieved
#[derive(Debug)]
pub struct PublishReport {
    pub state: PublishState,
    /// Filenames that made it to the release
    pub uploaded: Vec<String>,
    /// Filenames that did not, with the reason
    pub failed: Vec<(String, String)>,
}

/// Publish staged artifacts to the release for `tag`.
///
/// Creating (or finding) the release is all-or-nothing; individual uploads
/// are not. The report distinguishes complete, partial, and failed outcomes
/// so the run summary can surface degraded releases.
pub fn publish(
    store: &dyn ReleaseStore,
    tag: &str,
    artifacts: &[Artifact],
) -> PublishReport {
    match ensure_release(store, tag) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("[publish] {}", e);
            return PublishReport {
                state: PublishState::Failed,
                uploaded: Vec::new(),
                failed: artifacts
                    .iter()
                    .map(|a| (a.filename.clone(), "release unavailable".to_string()))
                    .collect(),
            };
        }
    }

    let mut uploaded = Vec::new();
    let mut failed = Vec::new();
    for artifact in artifacts {
        match store.upload(tag, &artifact.path, &artifact.filename) {
            Ok(()) => uploaded.push(artifact.filename.clone()),
            Err(e) => {
                eprintln!("[publish] {}", e);
                failed.push((artifact.filename.clone(), e.to_string()));
            }
        }
    }

    let state = if failed.is_empty() {
        PublishState::Complete
    } else if uploaded.is_empty() {
        PublishState::Failed
    } else {
        PublishState::Partial
    };

    PublishReport {
        state,
        uploaded,
        failed,
    }
}

fn ensure_release(store: &dyn ReleaseStore, tag: &str) -> Result<(), PublishError> {
    if store.release_exists(tag)? {
        return Ok(());
    }
    store.create_release(tag)
}

/// Release store backed by the GitHub CLI
pub struct GhReleaseStore {
    command: String,
    /// `owner/repo` slug; `gh` infers it from the checkout when absent
    repo: Option<String>,
    /// Token exported as `GH_TOKEN` for every invocation
    token: Option<String>,
    /// Checkout to run in, for repo inference
    work_dir: PathBuf,
}

impl GhReleaseStore {
    pub fn new(repo: Option<String>, token: Option<String>, work_dir: PathBuf) -> Self {
        Self {
            command: "gh".to_string(),
            repo,
            token,
            work_dir,
        }
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output, PublishError> {
        let mut cmd = Command::new(&self.command);
        cmd.current_dir(&self.work_dir).args(args);
        // --repo is a subcommand flag, so it goes after the args
        if let Some(ref repo) = self.repo {
            cmd.args(["--repo", repo]);
        }
        if let Some(ref token) = self.token {
            cmd.env("GH_TOKEN", token);
        }
        cmd.output().map_err(|source| PublishError::Spawn {
            command: self.command.clone(),
            source,
        })
    }
}

impl ReleaseStore for GhReleaseStore {
    fn release_exists(&self, tag: &str) -> Result<bool, PublishError> {
        let output = self.run(&["release", "view", tag])?;
        if output.status.success() {
            return Ok(true);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("release not found") || stderr.contains("Not Found") {
            return Ok(false);
        }
        Err(PublishError::StoreRejected {
            tag: tag.to_string(),
            detail: stderr.trim().to_string(),
        })
    }

    fn create_release(&self, tag: &str) -> Result<(), PublishError> {
        let title = format!("towboot {}", tag);
        let output = self.run(&[
            "release", "create", tag, "--title", &title, "--generate-notes",
        ])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PublishError::StoreRejected {
                tag: tag.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn upload(&self, tag: &str, path: &Path, filename: &str) -> Result<(), PublishError> {
        // --clobber keeps re-runs idempotent
        let path_str = path.to_string_lossy();
        let output = self.run(&["release", "upload", tag, &path_str, "--clobber"])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(PublishError::UploadFailed {
                filename: filename.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
