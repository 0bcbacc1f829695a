//! Run/target status taxonomy and stable exit codes

use serde::{Deserialize, Serialize};

/// Outcome of one build target or of the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Completed successfully
    Success,
    /// Failed during execution
    Failed,
    /// Cancelled before completion
    Cancelled,
    /// Run-level only: builds succeeded but publication was incomplete
    Degraded,
}

impl Status {
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed | Status::Cancelled | Status::Degraded)
    }
}

/// Stable exit codes reported to the invoking environment
///
/// Operators and CI wrappers key off these values, so they never change
/// meaning between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful run
    Success = 0,
    /// Version could not be resolved from git metadata
    VersionUnresolvable = 10,
    /// Configuration error, including an empty target matrix
    Config = 20,
    /// Every target in the matrix failed to build
    AllBuildsFailed = 50,
    /// The release store was unreachable or rejected the release
    PublishFailed = 70,
    /// Some artifacts uploaded, others did not
    DegradedPublish = 75,
    /// Run cancelled by signal
    Cancelled = 80,
}

impl ExitCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            10 => Some(ExitCode::VersionUnresolvable),
            20 => Some(ExitCode::Config),
            50 => Some(ExitCode::AllBuildsFailed),
            70 => Some(ExitCode::PublishFailed),
            75 => Some(ExitCode::DegradedPublish),
            80 => Some(ExitCode::Cancelled),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }
}

impl Default for ExitCode {
    fn default() -> Self {
        ExitCode::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&Status::Success).unwrap(),
            r#""success""#
        );
        assert_eq!(
            serde_json::to_string(&Status::Failed).unwrap(),
            r#""failed""#
        );
        assert_eq!(
            serde_json::to_string(&Status::Degraded).unwrap(),
            r#""degraded""#
        );
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::VersionUnresolvable.as_i32(), 10);
        assert_eq!(ExitCode::Config.as_i32(), 20);
        assert_eq!(ExitCode::AllBuildsFailed.as_i32(), 50);
        assert_eq!(ExitCode::PublishFailed.as_i32(), 70);
        assert_eq!(ExitCode::DegradedPublish.as_i32(), 75);
        assert_eq!(ExitCode::Cancelled.as_i32(), 80);
    }

    #[test]
    fn test_exit_code_roundtrip() {
        for code in [0, 10, 20, 50, 70, 75, 80] {
            assert_eq!(ExitCode::from_i32(code).unwrap().as_i32(), code);
        }
        assert_eq!(ExitCode::from_i32(999), None);
    }

    #[test]
    fn test_status_is_failure() {
        assert!(!Status::Success.is_failure());
        assert!(Status::Failed.is_failure());
        assert!(Status::Cancelled.is_failure());
        assert!(Status::Degraded.is_failure());
    }
}
