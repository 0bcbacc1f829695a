//! External toolchain invocation
//!
//! Each target in the matrix is built by spawning the Rust toolchain as a
//! child process with per-target arguments. Invocations stream their output
//! to a per-target build log, honour a wall-clock timeout, and respond to
//! cancellation by terminating the child. A failed target never aborts the
//! rest of the matrix; the failure travels back as a `BuildResult`.

mod pool;

pub use pool::{run_builds, PoolConfig};

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;

use crate::matrix::BuildTarget;
use crate::signal::CancelFlag;

/// Why a single target's build did not produce an artifact
#[derive(Debug, Error)]
pub enum BuildFailure {
    /// The toolchain binary could not be started
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The toolchain ran and exited non-zero
    #[error("toolchain exited with {detail}")]
    NonZeroExit { detail: String },

    /// The build exceeded its wall-clock timeout and was killed
    #[error("build timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The toolchain exited zero but the expected product is missing
    #[error("expected build output missing at {path}")]
    MissingOutput { path: PathBuf },

    /// The run was cancelled while this build was pending or running
    #[error("build cancelled")]
    Cancelled,

    /// Log or filesystem trouble around the invocation itself
    #[error("I/O error during build: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildFailure {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildFailure::Cancelled)
    }
}

/// Outcome of one target's build
#[derive(Debug)]
pub struct BuildResult {
    /// The target that was built
    pub target: BuildTarget,
    /// Path to the produced binary on success
    pub outcome: Result<PathBuf, BuildFailure>,
    /// Wall-clock duration of this build in milliseconds
    pub duration_ms: u64,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// An external toolchain that can build one target.
///
/// The production implementation shells out to cargo; tests substitute a
/// scripted mock.
pub trait Toolchain: Send + Sync {
    /// Build `target`, returning the path to the produced binary.
    ///
    /// Implementations check `cancel` periodically and return
    /// [`BuildFailure::Cancelled`] promptly once it is set.
    fn build(&self, target: &BuildTarget, cancel: &CancelFlag) -> Result<PathBuf, BuildFailure>;
}

/// Configuration for cargo invocations
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    /// Toolchain command to spawn
    pub command: String,
    /// Checkout to build in
    pub repo_root: PathBuf,
    /// Directory for per-target build logs
    pub log_dir: PathBuf,
    /// Name of the produced binary under the target directory
    pub product: String,
    /// Wall-clock timeout per build
    pub timeout: Duration,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            command: "cargo".to_string(),
            repo_root: PathBuf::from("."),
            log_dir: PathBuf::from("build-logs"),
            product: "towboot.efi".to_string(),
            timeout: Duration::from_secs(1800),
        }
    }
}

/// Builds targets by spawning `cargo build` per target.
pub struct CargoToolchain {
    config: ToolchainConfig,
}

impl CargoToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    /// Arguments for one target's invocation.
    fn build_args(&self, target: &BuildTarget) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "--target".to_string(),
            target.arch.triple().to_string(),
        ];
        if target.profile.is_release() {
            args.push("--release".to_string());
        }
        args
    }

    /// Where the toolchain leaves the product for `target`.
    fn product_path(&self, target: &BuildTarget) -> PathBuf {
        self.config
            .repo_root
            .join("target")
            .join(target.arch.triple())
            .join(target.profile.target_dir())
            .join(&self.config.product)
    }

    fn log_path(&self, target: &BuildTarget) -> PathBuf {
        self.config
            .log_dir
            .join(format!("build-{}-{}.log", target.arch, target.profile))
    }

    /// Spawn the toolchain and wait for it, streaming output to the build
    /// log and polling for timeout and cancellation.
    fn run_toolchain(
        &self,
        target: &BuildTarget,
        cancel: &CancelFlag,
    ) -> Result<(), BuildFailure> {
        let args = self.build_args(target);

        fs::create_dir_all(&self.config.log_dir)?;
        let log_path = self.log_path(target);
        let log_file = File::create(&log_path)?;
        let log = Arc::new(Mutex::new(log_file));

        {
            let mut f = log.lock().map_err(|_| BuildFailure::NonZeroExit {
                detail: "build log lock poisoned".to_string(),
            })?;
            writeln!(f, "command: {} {}", self.config.command, args.join(" "))?;
            writeln!(f, "working_dir: {}", self.config.repo_root.display())?;
            writeln!(f, "started_at: {}", Utc::now().to_rfc3339())?;
        }

        let mut command = Command::new(&self.config.command);
        command
            .args(&args)
            .current_dir(&self.config.repo_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a kill reaches rustc and any other
        // grandchildren the toolchain spawns
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| BuildFailure::Spawn {
            command: self.config.command.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let log_clone = Arc::clone(&log);
        let stdout_handle = std::thread::spawn(move || {
            if let Some(stdout) = stdout {
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    if let Ok(mut f) = log_clone.lock() {
                        let _ = writeln!(f, "{}", line);
                    }
                }
            }
        });

        let log_clone = Arc::clone(&log);
        let stderr_handle = std::thread::spawn(move || {
            if let Some(stderr) = stderr {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    if let Ok(mut f) = log_clone.lock() {
                        let _ = writeln!(f, "[stderr] {}", line);
                    }
                }
            }
        });

        let started = Instant::now();
        let status = loop {
            if cancel.is_cancelled() {
                // Reader threads are not joined here: they exit at pipe EOF
                // once the group is dead, and joining would stall if any
                // grandchild survived with the write end open
                terminate_child(&mut child)?;
                return Err(BuildFailure::Cancelled);
            }

            if started.elapsed() >= self.config.timeout {
                terminate_child(&mut child)?;
                return Err(BuildFailure::Timeout {
                    timeout_secs: self.config.timeout.as_secs(),
                });
            }

            match child.try_wait()? {
                Some(status) => break status,
                None => std::thread::sleep(Duration::from_millis(100)),
            }
        };

        let _ = stdout_handle.join();
        let _ = stderr_handle.join();

        if let Ok(mut f) = log.lock() {
            let _ = writeln!(f, "ended_at: {}", Utc::now().to_rfc3339());
            let _ = writeln!(f, "exit: {}", status);
        }

        if status.success() {
            Ok(())
        } else {
            let detail = match status.code() {
                Some(code) => format!("status {} (log: {})", code, log_path.display()),
                None => format!("a signal (log: {})", log_path.display()),
            };
            Err(BuildFailure::NonZeroExit { detail })
        }
    }
}

/// Kill a child's whole process group and reap the child.
fn terminate_child(child: &mut Child) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        // Negative pid targets the group created at spawn
        let pgid = Pid::from_raw(-(child.id() as i32));
        let _ = signal::kill(pgid, Signal::SIGKILL);
    }
    let _ = child.kill();
    let _ = child.wait();
    Ok(())
}

impl Toolchain for CargoToolchain {
    fn build(&self, target: &BuildTarget, cancel: &CancelFlag) -> Result<PathBuf, BuildFailure> {
        if cancel.is_cancelled() {
            return Err(BuildFailure::Cancelled);
        }

        self.run_toolchain(target, cancel)?;

        let product = self.product_path(target);
        if !product.exists() {
            return Err(BuildFailure::MissingOutput { path: product });
        }
        Ok(product)
    }
}

/// Build one target with timing, converting the outcome into a
/// [`BuildResult`].
pub fn build_target(
    toolchain: &dyn Toolchain,
    target: BuildTarget,
    cancel: &CancelFlag,
) -> BuildResult {
    let started = Instant::now();
    let outcome = toolchain.build(&target, cancel);
    BuildResult {
        target,
        outcome,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}
