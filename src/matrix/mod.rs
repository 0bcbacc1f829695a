//! Target matrix construction
//!
//! The pipeline builds `towboot.efi` once per (architecture, profile) pair.
//! The architecture set is closed and fixed per run; entries are independent
//! of each other, so adding or removing one must never affect how another
//! is built or named.

use serde::{Deserialize, Serialize};

/// Processor architectures towboot is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 32-bit x86 (ia32 UEFI)
    I686,
    /// 64-bit x86
    X86_64,
}

impl Arch {
    /// Short identifier used in artifact filenames
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::I686 => "i686",
            Arch::X86_64 => "x86_64",
        }
    }

    /// Rust target triple passed to the toolchain
    pub fn triple(&self) -> &'static str {
        match self {
            Arch::I686 => "i686-unknown-uefi",
            Arch::X86_64 => "x86_64-unknown-uefi",
        }
    }

    /// All supported architectures, in canonical order
    pub fn all() -> &'static [Arch] {
        &[Arch::I686, Arch::X86_64]
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i686" => Ok(Arch::I686),
            "x86_64" => Ok(Arch::X86_64),
            _ => Err(MatrixError::UnknownArch(s.to_string())),
        }
    }
}

/// Build profile for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Plain verification builds
    #[default]
    Debug,
    /// Tag-triggered release builds
    Release,
}

impl Profile {
    pub fn is_release(&self) -> bool {
        matches!(self, Profile::Release)
    }

    /// Directory name cargo uses for this profile's output
    pub fn target_dir(&self) -> &'static str {
        match self {
            Profile::Debug => "debug",
            Profile::Release => "release",
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Debug => write!(f, "debug"),
            Profile::Release => write!(f, "release"),
        }
    }
}

/// One independent build job: an architecture compiled under a profile
///
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub arch: Arch,
    pub profile: Profile,
}

impl BuildTarget {
    pub fn new(arch: Arch, profile: Profile) -> Self {
        Self { arch, profile }
    }
}

impl std::fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.arch, self.profile)
    }
}

/// Matrix construction errors
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    /// The configured architecture set resolved to nothing
    #[error("target matrix is empty: at least one architecture is required")]
    EmptyTargetMatrix,

    /// An architecture name outside the closed set
    #[error("unknown architecture: {0} (expected one of: i686, x86_64)")]
    UnknownArch(String),
}

/// The fixed set of build targets for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatrix {
    targets: Vec<BuildTarget>,
}

impl TargetMatrix {
    /// Build the matrix for the given architectures under one profile.
    ///
    /// Duplicate architectures are collapsed so that (version, arch) stays a
    /// unique artifact key.
    pub fn new(arches: &[Arch], profile: Profile) -> Result<Self, MatrixError> {
        let mut seen = Vec::new();
        let mut targets = Vec::new();
        for arch in arches {
            if seen.contains(arch) {
                continue;
            }
            seen.push(*arch);
            targets.push(BuildTarget::new(*arch, profile));
        }

        if targets.is_empty() {
            return Err(MatrixError::EmptyTargetMatrix);
        }

        Ok(Self { targets })
    }

    /// The default matrix: every supported architecture
    pub fn full(profile: Profile) -> Self {
        let targets = Arch::all()
            .iter()
            .map(|arch| BuildTarget::new(*arch, profile))
            .collect();
        Self { targets }
    }

    /// Parse a matrix from architecture names (config or CLI)
    pub fn from_names(names: &[String], profile: Profile) -> Result<Self, MatrixError> {
        if names.is_empty() {
            return Err(MatrixError::EmptyTargetMatrix);
        }
        let arches = names
            .iter()
            .map(|n| n.parse::<Arch>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&arches, profile)
    }

    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BuildTarget> {
        self.targets.iter()
    }
}
