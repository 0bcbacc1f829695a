//! Aggregated run summary (`run_summary.json`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::failure::{ExitCode, Status};
use super::target_summary::TargetSummary;

/// Schema version for run_summary.json
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for run_summary.json
pub const RUN_SUMMARY_SCHEMA_ID: &str = "towboot-ci/run_summary@1";

/// Publication outcome recorded in the run summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    /// Trigger did not hold; publication never attempted
    Skipped,
    /// Every collected artifact uploaded
    Complete,
    /// Some uploads succeeded, some failed
    Partial,
    /// Store unreachable or release rejected outright
    Failed,
}

/// Aggregated summary of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// Run identifier
    pub run_id: String,

    /// When the summary was created
    pub created_at: DateTime<Utc>,

    /// Version descriptor the run resolved, when it got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Aggregated status
    pub status: Status,

    /// Aggregated exit code
    pub exit_code: i32,

    /// Per-target outcomes
    pub targets: Vec<TargetSummary>,

    /// Count of targets that built successfully
    pub targets_succeeded: usize,

    /// Count of targets that failed
    pub targets_failed: usize,

    /// Count of targets cancelled
    pub targets_cancelled: usize,

    /// Publication outcome
    pub publish: PublishState,

    /// Remote filenames uploaded, for release runs
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub uploaded: Vec<String>,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,

    /// Human-readable summary line
    pub human_summary: String,
}

impl RunSummary {
    /// Aggregate per-target summaries and the publish outcome into a run
    /// summary.
    pub fn aggregate(
        run_id: String,
        version: Option<String>,
        targets: Vec<TargetSummary>,
        publish: PublishState,
        uploaded: Vec<String>,
        duration_ms: u64,
    ) -> Self {
        let targets_succeeded = targets.iter().filter(|t| t.status == Status::Success).count();
        let targets_failed = targets.iter().filter(|t| t.status == Status::Failed).count();
        let targets_cancelled = targets
            .iter()
            .filter(|t| t.status == Status::Cancelled)
            .count();

        let (status, exit_code) = Self::overall(
            &targets,
            targets_succeeded,
            targets_cancelled,
            &publish,
        );

        let human_summary = Self::human_line(
            status,
            targets.len(),
            targets_succeeded,
            targets_failed,
            &publish,
        );

        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            run_id,
            created_at: Utc::now(),
            version,
            status,
            exit_code: exit_code.as_i32(),
            targets,
            targets_succeeded,
            targets_failed,
            targets_cancelled,
            publish,
            uploaded,
            duration_ms,
            human_summary,
        }
    }

    /// Aggregation rules: cancellation dominates, then total build failure,
    /// then publish problems; a publish that partially landed is degraded,
    /// not silently successful.
    fn overall(
        targets: &[TargetSummary],
        succeeded: usize,
        cancelled: usize,
        publish: &PublishState,
    ) -> (Status, ExitCode) {
        if cancelled > 0 {
            return (Status::Cancelled, ExitCode::Cancelled);
        }
        if succeeded == 0 && !targets.is_empty() {
            return (Status::Failed, ExitCode::AllBuildsFailed);
        }
        match publish {
            PublishState::Failed => (Status::Failed, ExitCode::PublishFailed),
            PublishState::Partial => (Status::Degraded, ExitCode::DegradedPublish),
            PublishState::Complete | PublishState::Skipped => {
                (Status::Success, ExitCode::Success)
            }
        }
    }

    fn human_line(
        status: Status,
        target_count: usize,
        succeeded: usize,
        failed: usize,
        publish: &PublishState,
    ) -> String {
        match status {
            Status::Success => match publish {
                PublishState::Complete => format!(
                    "Run succeeded: {}/{} targets built, all artifacts published",
                    succeeded, target_count
                ),
                _ => {
                    if failed > 0 {
                        format!(
                            "Run succeeded: {}/{} targets built ({} failed)",
                            succeeded, target_count, failed
                        )
                    } else {
                        format!("Run succeeded: {}/{} targets built", succeeded, target_count)
                    }
                }
            },
            Status::Failed => match publish {
                PublishState::Failed => "Run failed: artifact publication failed".to_string(),
                _ => format!("Run failed: all {} targets failed to build", target_count),
            },
            Status::Degraded => format!(
                "Run degraded: {}/{} targets built but only part of the artifacts published",
                succeeded, target_count
            ),
            Status::Cancelled => "Run cancelled".to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))?;
        fs::write(path, json)
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }

    pub fn exit_code_enum(&self) -> Option<ExitCode> {
        ExitCode::from_i32(self.exit_code)
    }
}
