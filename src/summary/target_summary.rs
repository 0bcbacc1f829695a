//! Per-target summary entries

use serde::{Deserialize, Serialize};

use super::failure::Status;
use crate::matrix::{Arch, Profile};

/// Summary of one target's build (and, on release runs, its upload)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSummary {
    /// Architecture that was built
    pub arch: Arch,

    /// Profile it was built under
    pub profile: Profile,

    /// Final status for this target
    pub status: Status,

    /// Failure reason, when status is not success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Canonical artifact filename, when one was collected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,

    /// Wall-clock build duration in milliseconds
    pub duration_ms: u64,
}

impl TargetSummary {
    pub fn success(arch: Arch, profile: Profile, artifact: Option<String>, duration_ms: u64) -> Self {
        Self {
            arch,
            profile,
            status: Status::Success,
            detail: None,
            artifact,
            duration_ms,
        }
    }

    pub fn failure(arch: Arch, profile: Profile, detail: String, duration_ms: u64) -> Self {
        Self {
            arch,
            profile,
            status: Status::Failed,
            detail: Some(detail),
            artifact: None,
            duration_ms,
        }
    }

    pub fn cancelled(arch: Arch, profile: Profile, duration_ms: u64) -> Self {
        Self {
            arch,
            profile,
            status: Status::Cancelled,
            detail: Some("build cancelled".to_string()),
            artifact: None,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_summary() {
        let s = TargetSummary::success(
            Arch::X86_64,
            Profile::Release,
            Some("towboot-v1.2.0-x86_64.efi".to_string()),
            1500,
        );
        assert_eq!(s.status, Status::Success);
        assert!(s.detail.is_none());
        assert_eq!(s.artifact.as_deref(), Some("towboot-v1.2.0-x86_64.efi"));
    }

    #[test]
    fn test_failure_summary_serialization() {
        let s = TargetSummary::failure(
            Arch::I686,
            Profile::Debug,
            "toolchain exited with status 101".to_string(),
            320,
        );
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains(r#""arch":"i686""#));
        assert!(json.contains(r#""status":"failed""#));
        assert!(json.contains("toolchain exited"));
        assert!(!json.contains("artifact"));
    }
}
