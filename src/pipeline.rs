//! Pipeline orchestration
//!
//! One run: resolve the version once, fix the target matrix, build every
//! target through the worker pool, collect artifacts, publish when the
//! trigger says so, and persist a run summary whose exit code the process
//! reports.

use std::time::Instant;

use thiserror::Error;
use ulid::Ulid;

use crate::artifact::{self, Artifact, ArtifactError};
use crate::config::{ConfigError, PipelineConfig};
use crate::invoke::{run_builds, PoolConfig, Toolchain};
use crate::matrix::{MatrixError, Profile, TargetMatrix};
use crate::publish::{publish, ReleaseStore};
use crate::signal::CancelFlag;
use crate::summary::{ExitCode, PublishState, RunSummary, TargetSummary};
use crate::trigger::TriggerContext;
use crate::version::{self, VersionError};

/// Errors that abort a run before it can produce a summary
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("failed to persist run summary: {0}")]
    Summary(#[from] std::io::Error),
}

impl PipelineError {
    /// Stable exit code for an aborted run.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PipelineError::Version(_) => ExitCode::VersionUnresolvable,
            PipelineError::Matrix(_) | PipelineError::Config(_) => ExitCode::Config,
            PipelineError::Artifact(_) | PipelineError::Summary(_) => ExitCode::PublishFailed,
        }
    }
}

/// What a completed run produced
#[derive(Debug)]
pub struct PipelineOutcome {
    pub summary: RunSummary,
    pub artifacts: Vec<Artifact>,
}

impl PipelineOutcome {
    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code
    }
}

/// Execute one pipeline run.
///
/// The trigger decision and the version are fixed before any build starts;
/// nothing re-reads them mid-run. The run summary is written into the
/// artifact directory before this returns.
pub fn run(
    config: &PipelineConfig,
    trigger: &TriggerContext,
    profile: Profile,
    toolchain: &dyn Toolchain,
    store: &dyn ReleaseStore,
    cancel: &CancelFlag,
) -> Result<PipelineOutcome, PipelineError> {
    let started = Instant::now();
    let run_id = Ulid::new().to_string();

    let version = version::resolve(&config.repo_root)?;
    println!("[pipeline] run {} version {}", run_id, version);

    let matrix = TargetMatrix::from_names(&config.arches, profile)?;
    println!(
        "[pipeline] building {} target(s) with {} worker(s)",
        matrix.len(),
        config.jobs
    );

    let results = run_builds(
        toolchain,
        &matrix,
        &PoolConfig::new(config.jobs),
        cancel,
    );

    let artifacts = artifact::collect(&results, &version, &config.artifact_dir)?;
    for artifact in &artifacts {
        println!("[pipeline] staged {}", artifact.filename);
    }

    let targets: Vec<TargetSummary> = results
        .iter()
        .map(|result| match &result.outcome {
            Ok(_) => {
                let filename = artifacts
                    .iter()
                    .find(|a| a.target == result.target)
                    .map(|a| a.filename.clone());
                TargetSummary::success(
                    result.target.arch,
                    result.target.profile,
                    filename,
                    result.duration_ms,
                )
            }
            Err(failure) if failure.is_cancelled() => TargetSummary::cancelled(
                result.target.arch,
                result.target.profile,
                result.duration_ms,
            ),
            Err(failure) => TargetSummary::failure(
                result.target.arch,
                result.target.profile,
                failure.to_string(),
                result.duration_ms,
            ),
        })
        .collect();

    let (publish_state, uploaded) = publish_if_triggered(store, trigger, &artifacts, cancel);

    let summary = RunSummary::aggregate(
        run_id,
        Some(version.to_string()),
        targets,
        publish_state,
        uploaded,
        started.elapsed().as_millis() as u64,
    );
    summary.write_to_file(&config.artifact_dir.join("run_summary.json"))?;
    println!("[pipeline] {}", summary.human_summary);

    Ok(PipelineOutcome { summary, artifacts })
}

/// Publish when the trigger holds and there is something to publish.
///
/// Cancelled runs and runs with nothing staged skip the store entirely;
/// all-builds-failed already dominates the aggregated status.
fn publish_if_triggered(
    store: &dyn ReleaseStore,
    trigger: &TriggerContext,
    artifacts: &[Artifact],
    cancel: &CancelFlag,
) -> (PublishState, Vec<String>) {
    let tag = match &trigger.tag {
        Some(tag) if trigger.is_release() => tag,
        _ => return (PublishState::Skipped, Vec::new()),
    };
    if cancel.is_cancelled() || artifacts.is_empty() {
        return (PublishState::Skipped, Vec::new());
    }

    println!(
        "[pipeline] publishing {} artifact(s) to release {}",
        artifacts.len(),
        tag
    );
    let report = publish(store, tag, artifacts);
    (report.state, report.uploaded)
}
