//! End-to-end pipeline behavior with mock toolchain and release store.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use towboot_ci::config::PipelineConfig;
use towboot_ci::matrix::{Arch, Profile};
use towboot_ci::mock::{MockOutcome, MockReleaseStore, MockToolchain};
use towboot_ci::pipeline;
use towboot_ci::signal::CancelFlag;
use towboot_ci::summary::{ExitCode, PublishState, RunSummary, Status};
use towboot_ci::trigger::TriggerContext;

fn git(root: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(root)
        .args(args)
        .status()
        .expect("git available");
    assert!(status.success(), "git {:?} failed", args);
}

fn repo_with_tag(dir: &TempDir, tag: &str) {
    git(dir.path(), &["init", "-q"]);
    git(
        dir.path(),
        &[
            "-c",
            "user.email=ci@example.com",
            "-c",
            "user.name=ci",
            "commit",
            "-q",
            "--allow-empty",
            "-m",
            "init",
        ],
    );
    git(dir.path(), &["tag", tag]);
}

fn config_for(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        artifact_dir: dir.path().join("artifacts"),
        log_dir: dir.path().join("logs"),
        repo_root: dir.path().to_path_buf(),
        ..PipelineConfig::default()
    }
}

/// The v1.2.0 scenario end to end: a release tag push builds both
/// architectures and attaches exactly the two canonical filenames.
#[test]
fn release_tag_v120_produces_both_canonical_assets() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v1.2.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));
    let store = MockReleaseStore::new();

    let outcome = pipeline::run(
        &config,
        &TriggerContext::from_ref("refs/tags/v1.2.0"),
        Profile::Release,
        &toolchain,
        &store,
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(outcome.summary.status, Status::Success);
    assert_eq!(
        store.assets("v1.2.0"),
        vec!["towboot-v1.2.0-i686.efi", "towboot-v1.2.0-x86_64.efi"]
    );
    assert!(config
        .artifact_dir
        .join("towboot-v1.2.0-i686.efi")
        .exists());
    assert!(config
        .artifact_dir
        .join("towboot-v1.2.0-x86_64.efi")
        .exists());
    assert!(config.artifact_dir.join("SHA256SUMS").exists());
}

/// Exactly one summary entry per matrix target, success or not.
#[test]
fn one_result_per_target() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v1.0.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));
    toolchain.script(
        Arch::I686,
        MockOutcome::Fail {
            detail: "status 101".to_string(),
        },
    );

    let outcome = pipeline::run(
        &config,
        &TriggerContext::push(),
        Profile::Debug,
        &toolchain,
        &MockReleaseStore::new(),
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(outcome.summary.targets.len(), 2);
    let arches: Vec<Arch> = outcome.summary.targets.iter().map(|t| t.arch).collect();
    assert_eq!(arches, vec![Arch::I686, Arch::X86_64]);
}

/// A failed target is reported with its reason while the rest of the run
/// proceeds.
#[test]
fn partial_failure_is_tolerated_and_detailed() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v1.0.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));
    toolchain.script(
        Arch::X86_64,
        MockOutcome::Timeout,
    );

    let outcome = pipeline::run(
        &config,
        &TriggerContext::push(),
        Profile::Debug,
        &toolchain,
        &MockReleaseStore::new(),
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(outcome.summary.status, Status::Success);
    let failed = outcome
        .summary
        .targets
        .iter()
        .find(|t| t.arch == Arch::X86_64)
        .unwrap();
    assert_eq!(failed.status, Status::Failed);
    assert!(failed.detail.as_deref().unwrap().contains("timed out"));
}

/// All targets failing is a run failure with its own exit code.
#[test]
fn all_builds_failed_exit_code() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v1.0.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));
    for arch in [Arch::I686, Arch::X86_64] {
        toolchain.script(
            arch,
            MockOutcome::Fail {
                detail: "status 1".to_string(),
            },
        );
    }

    let outcome = pipeline::run(
        &config,
        &TriggerContext::push(),
        Profile::Debug,
        &toolchain,
        &MockReleaseStore::new(),
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(outcome.exit_code(), ExitCode::AllBuildsFailed.as_i32());
    assert!(outcome.artifacts.is_empty());
}

/// Every artifact of one run carries the same version descriptor.
#[test]
fn version_constant_across_run() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v2.0.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));

    let outcome = pipeline::run(
        &config,
        &TriggerContext::push(),
        Profile::Debug,
        &toolchain,
        &MockReleaseStore::new(),
        &CancelFlag::new(),
    )
    .unwrap();

    assert_eq!(outcome.summary.version.as_deref(), Some("v2.0.0"));
    for artifact in &outcome.artifacts {
        assert!(artifact.filename.contains("v2.0.0"));
    }
}

/// Artifact filenames within one run are unique per architecture.
#[test]
fn filenames_unique_per_arch() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v1.0.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));

    let outcome = pipeline::run(
        &config,
        &TriggerContext::push(),
        Profile::Debug,
        &toolchain,
        &MockReleaseStore::new(),
        &CancelFlag::new(),
    )
    .unwrap();

    let mut names: Vec<&str> = outcome
        .artifacts
        .iter()
        .map(|a| a.filename.as_str())
        .collect();
    names.sort();
    let before = names.len();
    names.dedup();
    assert_eq!(names.len(), before);
}

/// Re-running a release converges to the same final asset set.
#[test]
fn republishing_same_tag_is_idempotent() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v1.2.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));
    let store = MockReleaseStore::new();
    let trigger = TriggerContext::from_ref("refs/tags/v1.2.0");

    for _ in 0..2 {
        let outcome = pipeline::run(
            &config,
            &trigger,
            Profile::Release,
            &toolchain,
            &store,
            &CancelFlag::new(),
        )
        .unwrap();
        assert_eq!(outcome.summary.publish, PublishState::Complete);
    }

    assert_eq!(store.create_calls(), 1);
    assert_eq!(store.assets("v1.2.0").len(), 2);
}

/// Plain pushes and non-release tags build but never publish.
#[test]
fn non_release_triggers_never_touch_the_store() {
    for git_ref in ["refs/heads/main", "refs/tags/test-fixture"] {
        let dir = TempDir::new().unwrap();
        repo_with_tag(&dir, "v1.0.0");
        let config = config_for(&dir);
        let toolchain = MockToolchain::new(dir.path().join("products"));
        let store = MockReleaseStore::new();

        let outcome = pipeline::run(
            &config,
            &TriggerContext::from_ref(git_ref),
            Profile::Debug,
            &toolchain,
            &store,
            &CancelFlag::new(),
        )
        .unwrap();

        assert_eq!(outcome.summary.publish, PublishState::Skipped);
        assert_eq!(store.create_calls(), 0);
    }
}

/// The persisted run summary round-trips and matches the reported exit code.
#[test]
fn run_summary_persisted_next_to_artifacts() {
    let dir = TempDir::new().unwrap();
    repo_with_tag(&dir, "v1.0.0");
    let config = config_for(&dir);
    let toolchain = MockToolchain::new(dir.path().join("products"));

    let outcome = pipeline::run(
        &config,
        &TriggerContext::push(),
        Profile::Debug,
        &toolchain,
        &MockReleaseStore::new(),
        &CancelFlag::new(),
    )
    .unwrap();

    let loaded = RunSummary::from_file(&config.artifact_dir.join("run_summary.json")).unwrap();
    assert_eq!(loaded.exit_code, outcome.exit_code());
    assert_eq!(loaded.schema_id, "towboot-ci/run_summary@1");
    assert_eq!(loaded.targets.len(), 2);
}
