//! towboot-ci CLI
//!
//! Entry point for the `towboot-ci` command-line tool.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use towboot_ci::config::PipelineConfig;
use towboot_ci::invoke::{CargoToolchain, ToolchainConfig};
use towboot_ci::matrix::{Profile, TargetMatrix};
use towboot_ci::pipeline;
use towboot_ci::publish::GhReleaseStore;
use towboot_ci::signal::{self, SignalState};
use towboot_ci::summary::ExitCode;
use towboot_ci::trigger::TriggerContext;
use towboot_ci::version;

#[derive(Parser)]
#[command(name = "towboot-ci")]
#[command(about = "Build-and-release pipeline for towboot", version)]
struct Cli {
    /// Path to the pipeline config (default: towboot-ci.toml in the repo root)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Checkout to build in (overrides the config)
    #[arg(long, global = true)]
    repo_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build all targets and collect artifacts, without publishing
    Build {
        /// Build under the release profile
        #[arg(long)]
        release: bool,

        /// Architectures to build (default: all)
        #[arg(long, value_delimiter = ',')]
        arch: Option<Vec<String>>,

        /// Maximum concurrent builds
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
    },

    /// Run the full pipeline: build, collect, and publish when triggered
    Release {
        /// Git ref that started the run (default: $GITHUB_REF)
        #[arg(long)]
        git_ref: Option<String>,

        /// `owner/repo` slug for the release store
        #[arg(long)]
        repo: Option<String>,

        /// Token for the release store (default: $GH_TOKEN)
        #[arg(long, env = "GH_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Print the version descriptor the pipeline would stamp
    Version,

    /// Print the target matrix
    Targets {
        /// Show it for the release profile
        #[arg(long)]
        release: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let repo_root = cli.repo_root.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = match PipelineConfig::resolve(cli.config.as_deref(), &repo_root) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(ExitCode::Config.as_i32());
        }
    };
    if let Some(root) = cli.repo_root {
        config.repo_root = root;
    }

    match cli.command {
        Commands::Build {
            release,
            arch,
            jobs,
        } => {
            if let Some(arch) = arch {
                config.arches = arch;
            }
            if let Some(jobs) = jobs {
                config.jobs = jobs;
            }
            let profile = if release {
                Profile::Release
            } else {
                Profile::Debug
            };
            // Plain builds never publish, whatever the environment says
            run_pipeline(config, TriggerContext::push(), profile, None, None);
        }
        Commands::Release {
            git_ref,
            repo,
            token,
        } => {
            let trigger = match git_ref {
                Some(r) => TriggerContext::from_ref(&r),
                None => TriggerContext::from_env(),
            };
            let profile = Profile::Release;
            run_pipeline(config, trigger, profile, repo, token);
        }
        Commands::Version => match version::resolve(&config.repo_root) {
            Ok(tag) => println!("{}", tag),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(ExitCode::VersionUnresolvable.as_i32());
            }
        },
        Commands::Targets { release } => {
            let profile = if release {
                Profile::Release
            } else {
                Profile::Debug
            };
            match TargetMatrix::from_names(&config.arches, profile) {
                Ok(matrix) => {
                    for target in matrix.iter() {
                        println!("{}  {}", target, target.arch.triple());
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(ExitCode::Config.as_i32());
                }
            }
        }
    }
}

fn run_pipeline(
    config: PipelineConfig,
    trigger: TriggerContext,
    profile: Profile,
    repo: Option<String>,
    token: Option<String>,
) {
    let signal_state = Arc::new(SignalState::new());
    if let Err(e) = signal::install(Arc::clone(&signal_state)) {
        eprintln!("Error installing signal handler: {}", e);
        process::exit(ExitCode::Config.as_i32());
    }
    let cancel = signal_state.cancel_flag();

    let toolchain = CargoToolchain::new(ToolchainConfig {
        command: config.toolchain_command.clone(),
        repo_root: config.repo_root.clone(),
        log_dir: config.log_dir.clone(),
        product: config.product.clone(),
        timeout: Duration::from_secs(config.timeout_seconds),
    });

    let store = GhReleaseStore::new(
        repo.or_else(|| config.github_repo.clone()),
        token,
        config.repo_root.clone(),
    );

    match pipeline::run(&config, &trigger, profile, &toolchain, &store, &cancel) {
        Ok(outcome) => {
            process::exit(outcome.exit_code());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code().as_i32());
        }
    }
}
