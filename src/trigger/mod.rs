//! Release trigger evaluation
//!
//! Whether a run publishes is decided exactly once, up front, from the event
//! that started it. Only a push of a release tag (`v` followed by a digit)
//! triggers publication; plain pushes and pushes of non-release tags build
//! and collect but never touch the release store.

use std::env;

use serde::{Deserialize, Serialize};

/// Kind of event that started the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Plain branch push (or local invocation)
    Push,
    /// Push of a tag
    TagPush,
}

/// The event context a run was started with
///
/// Captured once at startup; the trigger decision derived from it holds for
/// the whole run even if the environment changes underneath.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub event: EventKind,
    /// Tag name for tag pushes (`v1.2.0`), without the ref prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl TriggerContext {
    pub fn push() -> Self {
        Self {
            event: EventKind::Push,
            tag: None,
        }
    }

    pub fn tag_push(tag: impl Into<String>) -> Self {
        Self {
            event: EventKind::TagPush,
            tag: Some(tag.into()),
        }
    }

    /// Derive the context from CI environment variables.
    ///
    /// `GITHUB_REF` of the form `refs/tags/<tag>` marks a tag push; anything
    /// else (including an unset variable, as in local runs) is a plain push.
    pub fn from_env() -> Self {
        match env::var("GITHUB_REF") {
            Ok(r) => Self::from_ref(&r),
            Err(_) => Self::push(),
        }
    }

    /// Derive the context from a git ref string.
    pub fn from_ref(git_ref: &str) -> Self {
        match git_ref.strip_prefix("refs/tags/") {
            Some(tag) if !tag.is_empty() => Self::tag_push(tag),
            _ => Self::push(),
        }
    }

    /// Whether this run publishes a release.
    ///
    /// True only for a tag push whose tag names a release: `v` followed by a
    /// digit. Tags like `test-fixture` or `vnext` do not qualify.
    pub fn is_release(&self) -> bool {
        match (&self.event, &self.tag) {
            (EventKind::TagPush, Some(tag)) => is_release_tag(tag),
            _ => false,
        }
    }
}

/// `v` + digit, the release tag convention.
fn is_release_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    chars.next() == Some('v') && chars.next().is_some_and(|c| c.is_ascii_digit())
}
