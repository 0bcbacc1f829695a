//! Mock toolchain and release store for tests
//!
//! Both mocks support failure injection so pipeline tests can exercise
//! partial build failure, degraded publication, and unreachable-store paths
//! without spawning external processes.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::invoke::{BuildFailure, Toolchain};
use crate::matrix::{Arch, BuildTarget};
use crate::publish::{PublishError, ReleaseStore};
use crate::signal::CancelFlag;

/// Scripted outcome for one architecture's mock build
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Produce a product file after an optional delay
    Success { delay_ms: u64 },
    /// Exit as if the toolchain failed
    Fail { detail: String },
    /// Behave as if the wall-clock timeout fired
    Timeout,
}

impl Default for MockOutcome {
    fn default() -> Self {
        MockOutcome::Success { delay_ms: 0 }
    }
}

/// Toolchain that produces scripted outcomes and placeholder products
pub struct MockToolchain {
    output_dir: PathBuf,
    outcomes: Mutex<HashMap<Arch, MockOutcome>>,
    builds: Mutex<Vec<BuildTarget>>,
}

impl MockToolchain {
    /// Mock building into `output_dir`; successes drop placeholder files
    /// there.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            outcomes: Mutex::new(HashMap::new()),
            builds: Mutex::new(Vec::new()),
        }
    }

    /// Script the outcome for one architecture. Unscripted architectures
    /// succeed immediately.
    pub fn script(&self, arch: Arch, outcome: MockOutcome) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.insert(arch, outcome);
        }
    }

    /// Targets this mock was asked to build, in dispatch order.
    pub fn builds(&self) -> Vec<BuildTarget> {
        self.builds.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl Toolchain for MockToolchain {
    fn build(&self, target: &BuildTarget, cancel: &CancelFlag) -> Result<PathBuf, BuildFailure> {
        if let Ok(mut builds) = self.builds.lock() {
            builds.push(*target);
        }

        if cancel.is_cancelled() {
            return Err(BuildFailure::Cancelled);
        }

        let outcome = self
            .outcomes
            .lock()
            .ok()
            .and_then(|o| o.get(&target.arch).cloned())
            .unwrap_or_default();

        match outcome {
            MockOutcome::Success { delay_ms } => {
                if delay_ms > 0 {
                    // Sleep in slices so cancellation is still prompt
                    let mut remaining = delay_ms;
                    while remaining > 0 {
                        if cancel.is_cancelled() {
                            return Err(BuildFailure::Cancelled);
                        }
                        let slice = remaining.min(10);
                        std::thread::sleep(Duration::from_millis(slice));
                        remaining -= slice;
                    }
                }
                fs::create_dir_all(&self.output_dir)?;
                let path = self
                    .output_dir
                    .join(format!("mock-{}-{}.efi", target.arch, target.profile));
                fs::write(&path, format!("mock product for {}", target))?;
                Ok(path)
            }
            MockOutcome::Fail { detail } => Err(BuildFailure::NonZeroExit { detail }),
            MockOutcome::Timeout => Err(BuildFailure::Timeout { timeout_secs: 1 }),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    releases: HashMap<String, HashSet<String>>,
    create_calls: usize,
    fail_uploads: HashSet<String>,
    unreachable: bool,
}

/// In-memory release store with failure injection
#[derive(Debug, Default)]
pub struct MockReleaseStore {
    state: Mutex<StoreState>,
}

impl MockReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a release, as if an earlier run already published it.
    pub fn seed_release(&self, tag: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.releases.entry(tag.to_string()).or_default();
        }
    }

    /// Make uploads of `filename` fail.
    pub fn fail_upload(&self, filename: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_uploads.insert(filename.to_string());
        }
    }

    /// Make every store operation fail, as if the network were down.
    pub fn set_unreachable(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.unreachable = true;
        }
    }

    pub fn release_created(&self, tag: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.releases.contains_key(tag))
            .unwrap_or(false)
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().map(|s| s.create_calls).unwrap_or(0)
    }

    /// Asset filenames attached to a release, sorted.
    pub fn assets(&self, tag: &str) -> Vec<String> {
        let mut assets = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.releases.get(tag).map(|a| a.iter().cloned().collect::<Vec<_>>()))
            .unwrap_or_default();
        assets.sort();
        assets
    }

    fn check_reachable(&self, tag: &str) -> Result<(), PublishError> {
        let unreachable = self.state.lock().map(|s| s.unreachable).unwrap_or(true);
        if unreachable {
            Err(PublishError::StoreRejected {
                tag: tag.to_string(),
                detail: "store unreachable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl ReleaseStore for MockReleaseStore {
    fn release_exists(&self, tag: &str) -> Result<bool, PublishError> {
        self.check_reachable(tag)?;
        Ok(self.release_created(tag))
    }

    fn create_release(&self, tag: &str) -> Result<(), PublishError> {
        self.check_reachable(tag)?;
        if let Ok(mut state) = self.state.lock() {
            state.create_calls += 1;
            state.releases.entry(tag.to_string()).or_default();
        }
        Ok(())
    }

    fn upload(&self, tag: &str, _path: &Path, filename: &str) -> Result<(), PublishError> {
        self.check_reachable(tag)?;
        let mut state = self.state.lock().map_err(|_| PublishError::StoreRejected {
            tag: tag.to_string(),
            detail: "store state poisoned".to_string(),
        })?;

        if state.fail_uploads.contains(filename) {
            return Err(PublishError::UploadFailed {
                filename: filename.to_string(),
                detail: "injected upload failure".to_string(),
            });
        }

        match state.releases.get_mut(tag) {
            Some(assets) => {
                // Overwrite semantics: same name replaces, never duplicates
                assets.insert(filename.to_string());
                Ok(())
            }
            None => Err(PublishError::StoreRejected {
                tag: tag.to_string(),
                detail: "release does not exist".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Profile;
    use tempfile::TempDir;

    #[test]
    fn test_mock_toolchain_default_success() {
        let dir = TempDir::new().unwrap();
        let toolchain = MockToolchain::new(dir.path());
        let target = BuildTarget::new(Arch::X86_64, Profile::Release);

        let path = toolchain.build(&target, &CancelFlag::new()).unwrap();
        assert!(path.exists());
        assert_eq!(toolchain.builds().len(), 1);
    }

    #[test]
    fn test_mock_toolchain_scripted_failure() {
        let dir = TempDir::new().unwrap();
        let toolchain = MockToolchain::new(dir.path());
        toolchain.script(
            Arch::I686,
            MockOutcome::Fail {
                detail: "status 101".to_string(),
            },
        );

        let target = BuildTarget::new(Arch::I686, Profile::Debug);
        let result = toolchain.build(&target, &CancelFlag::new());
        assert!(matches!(result, Err(BuildFailure::NonZeroExit { .. })));
    }

    #[test]
    fn test_mock_toolchain_cancel_during_delay() {
        let dir = TempDir::new().unwrap();
        let toolchain = MockToolchain::new(dir.path());
        toolchain.script(Arch::X86_64, MockOutcome::Success { delay_ms: 5000 });

        let cancel = CancelFlag::new();
        cancel.cancel();

        let target = BuildTarget::new(Arch::X86_64, Profile::Release);
        let result = toolchain.build(&target, &cancel);
        assert!(matches!(result, Err(BuildFailure::Cancelled)));
    }

    #[test]
    fn test_mock_store_upload_requires_release() {
        let store = MockReleaseStore::new();
        let result = store.upload("v1.2.0", Path::new("/tmp/x.efi"), "x.efi");
        assert!(matches!(result, Err(PublishError::StoreRejected { .. })));

        store.seed_release("v1.2.0");
        store
            .upload("v1.2.0", Path::new("/tmp/x.efi"), "x.efi")
            .unwrap();
        assert_eq!(store.assets("v1.2.0"), vec!["x.efi"]);
    }

    #[test]
    fn test_mock_store_unreachable() {
        let store = MockReleaseStore::new();
        store.set_unreachable();
        assert!(store.release_exists("v1.2.0").is_err());
    }
}
