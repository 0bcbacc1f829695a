//! towboot-ci - Build-and-release pipeline for the towboot bootloader
//!
//! This crate builds `towboot.efi` for every supported architecture in
//! parallel, names and collects the resulting binaries under a stable
//! filename contract, and, for tag-triggered runs, attaches them to a
//! GitHub release. Partial build failures never sink the run; partial
//! publication is surfaced as a degraded result.

pub mod artifact;
pub mod config;
pub mod invoke;
pub mod matrix;
pub mod mock;
pub mod pipeline;
pub mod publish;
pub mod signal;
pub mod summary;
pub mod trigger;
pub mod version;

pub use artifact::{artifact_file_name, Artifact};
pub use config::PipelineConfig;
pub use invoke::{CargoToolchain, Toolchain, ToolchainConfig};
pub use matrix::{Arch, BuildTarget, Profile, TargetMatrix};
pub use pipeline::{PipelineError, PipelineOutcome};
pub use publish::{GhReleaseStore, ReleaseStore};
pub use signal::CancelFlag;
pub use summary::{ExitCode, RunSummary, Status};
pub use trigger::TriggerContext;
pub use version::VersionTag;
