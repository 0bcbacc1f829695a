//! Version resolution from git history
//!
//! The pipeline stamps every artifact with a single version descriptor
//! resolved once at the start of a run:
//!
//! - a tag exactly on HEAD resolves to that tag (`v1.2.0`)
//! - otherwise `git describe` yields `<tag>-<n>-g<hash>` for the nearest
//!   ancestor tag
//! - with no tag anywhere in history, the abbreviated commit hash alone
//!
//! If git metadata is unavailable entirely, the run aborts: nothing can be
//! named safely without a version.

use std::path::Path;
use std::process::Command;

/// A resolved, filename-safe version descriptor
///
/// Invariant: non-empty, no path separators, no whitespace. Stable for the
/// duration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag(String);

impl VersionTag {
    /// Wrap a raw descriptor, validating that it is safe to embed in a
    /// filename.
    pub fn new(raw: impl Into<String>) -> Result<Self, VersionError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(VersionError::Malformed {
                descriptor: raw,
                reason: "empty descriptor",
            });
        }
        if raw.chars().any(|c| c.is_whitespace()) {
            return Err(VersionError::Malformed {
                descriptor: raw,
                reason: "contains whitespace",
            });
        }
        if raw.contains('/') || raw.contains('\\') {
            return Err(VersionError::Malformed {
                descriptor: raw,
                reason: "contains a path separator",
            });
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version resolution errors
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// No usable source-control metadata at the checkout
    #[error("version unresolvable: {reason}")]
    Unresolvable { reason: String },

    /// git produced a descriptor that cannot go into a filename
    #[error("version descriptor {descriptor:?} is not filename-safe: {reason}")]
    Malformed {
        descriptor: String,
        reason: &'static str,
    },

    /// The git binary could not be spawned at all
    #[error("failed to run git: {0}")]
    GitUnavailable(#[from] std::io::Error),
}

/// Resolve the version descriptor for the checkout at `repo_root`.
///
/// Runs exactly once per pipeline run; callers hold on to the result rather
/// than re-resolving mid-run.
pub fn resolve(repo_root: &Path) -> Result<VersionTag, VersionError> {
    // Exact tag or tag-distance-hash descriptor
    if let Some(descriptor) = run_git(repo_root, &["describe", "--tags"])? {
        return VersionTag::new(descriptor);
    }

    // No tag anywhere in history: fall back to the abbreviated commit hash
    match run_git(repo_root, &["rev-parse", "--short", "HEAD"])? {
        Some(hash) => VersionTag::new(hash),
        None => Err(VersionError::Unresolvable {
            reason: format!(
                "no tags and no commits found at {}",
                repo_root.display()
            ),
        }),
    }
}

/// Run a git subcommand, returning trimmed stdout on success and `None` on a
/// non-zero exit (e.g. no tags, no commits).
fn run_git(repo_root: &Path, args: &[&str]) -> Result<Option<String>, VersionError> {
    let output = Command::new("git")
        .current_dir(repo_root)
        .args(args)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // "not a git repository" means metadata is absent, not merely tagless
        if stderr.contains("not a git repository") {
            return Err(VersionError::Unresolvable {
                reason: format!("{} is not a git repository", repo_root.display()),
            });
        }
        return Ok(None);
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        Ok(None)
    } else {
        Ok(Some(stdout))
    }
}
