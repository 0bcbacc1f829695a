//! Bounded worker pool for parallel target builds
//!
//! Targets are independent, so they build concurrently up to a configured
//! worker count. The pool joins every worker before returning: exactly one
//! result per matrix entry, in matrix order, no stragglers left running.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::matrix::TargetMatrix;
use crate::signal::CancelFlag;

use super::{build_target, BuildFailure, BuildResult, Toolchain};

/// Worker pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum concurrent builds
    pub jobs: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { jobs: 2 }
    }
}

impl PoolConfig {
    pub fn new(jobs: usize) -> Self {
        // A zero-worker pool would deadlock at dispatch
        Self { jobs: jobs.max(1) }
    }
}

/// Build every target in the matrix, at most `config.jobs` at a time.
///
/// Returns one [`BuildResult`] per matrix entry, in matrix order. When the
/// cancel flag is set, in-flight builds terminate and undispatched targets
/// come back as [`BuildFailure::Cancelled`] without starting.
pub fn run_builds(
    toolchain: &dyn Toolchain,
    matrix: &TargetMatrix,
    config: &PoolConfig,
    cancel: &CancelFlag,
) -> Vec<BuildResult> {
    let queue: Mutex<VecDeque<usize>> = Mutex::new((0..matrix.len()).collect());
    let slots: Vec<Mutex<Option<BuildResult>>> =
        (0..matrix.len()).map(|_| Mutex::new(None)).collect();

    let workers = config.jobs.min(matrix.len()).max(1);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = match queue.lock() {
                    Ok(mut q) => match q.pop_front() {
                        Some(index) => index,
                        None => return,
                    },
                    Err(_) => return,
                };

                let target = matrix.targets()[index];
                let result = if cancel.is_cancelled() {
                    BuildResult {
                        target,
                        outcome: Err(BuildFailure::Cancelled),
                        duration_ms: 0,
                    }
                } else {
                    build_target(toolchain, target, cancel)
                };

                if let Ok(mut slot) = slots[index].lock() {
                    *slot = Some(result);
                }
            });
        }
    });

    // Every index was dispatched exactly once, so every slot is filled
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot.into_inner() {
            Ok(Some(result)) => result,
            _ => BuildResult {
                target: matrix.targets()[index],
                outcome: Err(BuildFailure::Cancelled),
                duration_ms: 0,
            },
        })
        .collect()
}
