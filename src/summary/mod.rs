//! Run summaries and the exit-code taxonomy
//!
//! Every pipeline run ends by aggregating per-target outcomes and the
//! publication result into a `RunSummary`, persisted as `run_summary.json`
//! next to the collected artifacts. The exit code the process reports is
//! derived from the same aggregation, so the file and the exit status never
//! disagree.

mod failure;
mod run_summary;
mod target_summary;

pub use failure::{ExitCode, Status};
pub use run_summary::{
    PublishState, RunSummary, RUN_SUMMARY_SCHEMA_ID, RUN_SUMMARY_SCHEMA_VERSION,
};
pub use target_summary::TargetSummary;
