//! Artifact naming and collection
//!
//! Successful builds are copied into a flat staging directory under their
//! canonical names. The filename contract is byte-exact and shared with the
//! release consumers:
//!
//! ```text
//! towboot-<version>-<arch>.efi
//! ```
//!
//! `<version>` is the run's resolved descriptor, `<arch>` the short
//! architecture identifier. Failed targets contribute nothing; collection
//! never invents placeholders for them.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::invoke::BuildResult;
use crate::matrix::BuildTarget;
use crate::version::VersionTag;

/// Checksum manifest filename written next to the staged artifacts
pub const CHECKSUM_MANIFEST: &str = "SHA256SUMS";

/// Errors from artifact collection
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to stage {filename}: {source}")]
    Stage {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two successful builds mapped to the same canonical name
    #[error("duplicate artifact name: {0}")]
    DuplicateName(String),
}

/// Compose the canonical artifact filename for a target.
///
/// This string is a published contract; release consumers construct the same
/// name independently, so it changes for no reason short of a new major
/// scheme.
pub fn artifact_file_name(version: &VersionTag, target: &BuildTarget) -> String {
    format!("towboot-{}-{}.efi", version, target.arch)
}

/// One staged artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Target that produced it
    pub target: BuildTarget,
    /// Canonical filename
    pub filename: String,
    /// Staged location on disk
    pub path: PathBuf,
    /// SHA-256 of the staged bytes, hex-encoded
    pub sha256: String,
    /// Size of the staged bytes
    pub size_bytes: u64,
}

/// Copy successful build products into `artifact_dir` under their canonical
/// names.
///
/// Failed and cancelled targets are skipped with a note on stderr; the run
/// summary carries their detail. Returns the staged artifacts in matrix
/// order, plus a `SHA256SUMS` manifest when anything was staged.
pub fn collect(
    results: &[BuildResult],
    version: &VersionTag,
    artifact_dir: &Path,
) -> Result<Vec<Artifact>, ArtifactError> {
    fs::create_dir_all(artifact_dir)?;

    let mut artifacts: Vec<Artifact> = Vec::new();
    for result in results {
        let produced = match &result.outcome {
            Ok(path) => path,
            Err(failure) => {
                eprintln!(
                    "[artifact] skipping {}: {}",
                    result.target, failure
                );
                continue;
            }
        };

        let filename = artifact_file_name(version, &result.target);
        if artifacts.iter().any(|a| a.filename == filename) {
            return Err(ArtifactError::DuplicateName(filename));
        }

        let staged = artifact_dir.join(&filename);
        fs::copy(produced, &staged).map_err(|source| ArtifactError::Stage {
            filename: filename.clone(),
            source,
        })?;

        let (sha256, size_bytes) = hash_file(&staged)?;
        artifacts.push(Artifact {
            target: result.target,
            filename,
            path: staged,
            sha256,
            size_bytes,
        });
    }

    if !artifacts.is_empty() {
        write_checksums(&artifacts, artifact_dir)?;
    }

    Ok(artifacts)
}

/// SHA-256 a file in streaming fashion.
fn hash_file(path: &Path) -> Result<(String, u64), ArtifactError> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];
    let mut total: u64 = 0;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((hex::encode(hasher.finalize()), total))
}

/// Write the `SHA256SUMS` manifest in sha256sum(1) format.
fn write_checksums(artifacts: &[Artifact], artifact_dir: &Path) -> Result<(), ArtifactError> {
    let mut manifest = String::new();
    for artifact in artifacts {
        manifest.push_str(&artifact.sha256);
        manifest.push_str("  ");
        manifest.push_str(&artifact.filename);
        manifest.push('\n');
    }
    fs::write(artifact_dir.join(CHECKSUM_MANIFEST), manifest)?;
    Ok(())
}
