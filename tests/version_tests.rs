//! Version resolution against real git repositories.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use towboot_ci::version::{self, VersionError};

fn git(root: &Path, args: &[&str]) {
    let status = Command::new("git")
        .current_dir(root)
        .args(args)
        .status()
        .expect("git available");
    assert!(status.success(), "git {:?} failed", args);
}

fn commit(root: &Path, message: &str) {
    git(
        root,
        &[
            "-c",
            "user.email=ci@example.com",
            "-c",
            "user.name=ci",
            "commit",
            "-q",
            "--allow-empty",
            "-m",
            message,
        ],
    );
}

#[test]
fn exact_tag_resolves_to_tag() {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    commit(dir.path(), "init");
    git(dir.path(), &["tag", "v1.2.0"]);

    let tag = version::resolve(dir.path()).unwrap();
    assert_eq!(tag.as_str(), "v1.2.0");
}

#[test]
fn commits_past_tag_resolve_to_describe_descriptor() {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    commit(dir.path(), "init");
    git(dir.path(), &["tag", "v1.2.0"]);
    commit(dir.path(), "one");
    commit(dir.path(), "two");

    let tag = version::resolve(dir.path()).unwrap();
    assert!(
        tag.as_str().starts_with("v1.2.0-2-g"),
        "unexpected descriptor: {}",
        tag
    );
}

#[test]
fn untagged_history_resolves_to_short_hash() {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    commit(dir.path(), "init");

    let tag = version::resolve(dir.path()).unwrap();
    assert!(tag.as_str().len() >= 7);
    assert!(tag.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn non_repository_is_unresolvable() {
    let dir = TempDir::new().unwrap();

    let err = version::resolve(dir.path()).unwrap_err();
    assert!(matches!(err, VersionError::Unresolvable { .. }));
}

#[test]
fn resolution_is_stable_within_a_run() {
    let dir = TempDir::new().unwrap();
    git(dir.path(), &["init", "-q"]);
    commit(dir.path(), "init");
    git(dir.path(), &["tag", "v0.9.0"]);

    let first = version::resolve(dir.path()).unwrap();
    let second = version::resolve(dir.path()).unwrap();
    assert_eq!(first, second);
}
