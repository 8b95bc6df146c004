//! Implementation of the `installscipion` command.
//!
//! Turns the parsed arguments into an [`InstallConfig`], wires the real host
//! capabilities into an [`Installer`] and renders the outcome.

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::debug;

use scinstall_lib::config::{BackendChoice, Branches, InstallConfig, OptionalModules, Transport, default_parallelism};
use scinstall_lib::consts::{DEVEL_BRANCH, TROUBLESHOOTING_URL};
use scinstall_lib::execute::ShellRunner;
use scinstall_lib::host::{HostEnvironment, HostProbe};
use scinstall_lib::install::{InstallOutcome, InstallReport, InstallState, Installer, Reporter};
use scinstall_lib::plan::{CommandPlan, PlanSet};
use scinstall_lib::repo::FsCheckouts;

use crate::output::{
  OutputFormat, format_duration, print_banner, print_info, print_json, print_panel, print_stat, print_step,
  print_success, print_warning,
};
use crate::prompts;

#[derive(Debug, Args)]
pub struct InstallArgs {
  /// Location where Scipion will be installed
  pub path: PathBuf,

  /// Force the installation to use conda
  #[arg(long, conflicts_with = "venv")]
  pub conda: bool,

  /// Force the installation to use a python virtual environment
  #[arg(long)]
  pub venv: bool,

  /// Install from source checkouts instead of published packages
  #[arg(long = "dev")]
  pub devel: bool,

  /// Skip installation of xmipp
  #[arg(long)]
  pub no_optional_module: bool,

  /// Number of parallel jobs used to compile optional modules
  #[arg(short = 'j', long, default_value_t = default_parallelism())]
  pub parallelism: NonZeroUsize,

  /// Print the commands that would run, without running them
  #[arg(long)]
  pub dry_run: bool,

  /// Clone repositories over https instead of ssh
  #[arg(long)]
  pub use_https: bool,

  /// Never ask for confirmation, assume yes
  #[arg(long)]
  pub no_ask: bool,

  /// Name of the environment to create (default depends on the backend)
  #[arg(long)]
  pub env_name: Option<String>,

  /// Branch checked out for the core repositories
  #[arg(long, default_value = DEVEL_BRANCH)]
  pub core_branch: String,

  /// Branch checked out for the optional module repositories
  #[arg(long, default_value = DEVEL_BRANCH)]
  pub module_branch: String,

  /// Fast scratch directory recorded in the config file
  #[arg(long)]
  pub scratch_path: Option<PathBuf>,
}

impl InstallArgs {
  pub fn to_config(&self) -> Result<InstallConfig> {
    let home = std::path::absolute(&self.path)
      .with_context(|| format!("Invalid installation path: {}", self.path.display()))?;
    let mut config = InstallConfig::new(home)?;

    config.backend = if self.conda {
      BackendChoice::ForceConda
    } else if self.venv {
      BackendChoice::ForceVenv
    } else {
      BackendChoice::AutoDetect
    };
    config.env_name = self.env_name.clone();
    config.devel = self.devel;
    config.modules = OptionalModules {
      xmipp: !self.no_optional_module,
    };
    config.transport = if self.use_https { Transport::Https } else { Transport::Ssh };
    config.no_ask = self.no_ask;
    config.dry_run = self.dry_run;
    config.branches = Branches {
      core: self.core_branch.clone(),
      module: self.module_branch.clone(),
    };
    config.parallelism = self.parallelism;
    config.scratch = self.scratch_path.clone();

    Ok(config)
  }
}

/// Terminal-backed [`Reporter`]: prompts on stderr, everything else on stdout.
struct TerminalReporter {
  stdout: io::Stdout,
}

impl Reporter for TerminalReporter {
  fn confirm(&mut self, question: &str) -> bool {
    match prompts::confirm(question) {
      Ok(answer) => answer,
      Err(e) => {
        print_warning(&e.to_string());
        false
      }
    }
  }

  fn notice(&mut self, message: &str) {
    print_info(message);
  }

  fn progress(&mut self, state: InstallState) {
    debug!(%state, "reached");
  }

  fn plan(&mut self, title: &str, plan: &CommandPlan) {
    print_step(&format!("{} ({} steps)", title, plan.len()));
  }

  fn output(&mut self) -> &mut dyn Write {
    &mut self.stdout
  }
}

#[derive(Serialize)]
struct DryRunDocument<'a> {
  config: &'a InstallConfig,
  plans: PlanSet,
}

/// Execute the install command.
///
/// Returns `Ok(true)` when the run succeeded (or the dry run completed) and
/// `Ok(false)` when it was cancelled or failed; the outcome has already been
/// printed in both cases.
pub fn cmd_install(args: &InstallArgs, format: OutputFormat, interrupted: Arc<AtomicBool>) -> Result<bool> {
  let config = args.to_config()?;
  let host = HostEnvironment::from_process_env();
  let probe = HostProbe::system();
  let checkouts = FsCheckouts;
  let runner = ShellRunner::default().with_interrupt_flag(interrupted);

  let installer = Installer::new(&config, &host, &probe, &checkouts, &runner);

  if format.is_json() {
    return match installer.plans() {
      Ok(plans) => {
        print_json(&DryRunDocument { config: &config, plans })?;
        Ok(true)
      }
      Err(error) => {
        render_failure(&format!("Installation failed while {}", InstallState::Init.activity()), &error.to_string());
        Ok(false)
      }
    };
  }

  let start = Instant::now();
  let mut reporter = TerminalReporter { stdout: io::stdout() };
  let outcome = installer.run(&mut reporter);
  reporter.stdout.flush()?;

  match outcome {
    InstallOutcome::Success(report) => {
      render_success(&report, start.elapsed());
      Ok(true)
    }
    InstallOutcome::Cancelled { during, reason } => {
      print_panel(&format!("Installation cancelled while {}", during.activity()), reason.lines());
      Ok(false)
    }
    InstallOutcome::Failed { during, error } => {
      render_failure(&format!("Installation failed while {}", during.activity()), &error.to_string());
      Ok(false)
    }
  }
}

fn render_failure(header: &str, error: &str) {
  let more = format!("More information at {}", TROUBLESHOOTING_URL);
  let lines = error.lines().chain(["", more.as_str()]);
  print_panel(header, lines);
}

fn render_success(report: &InstallReport, elapsed: std::time::Duration) {
  if report.dry_run {
    print_success("Dry run complete. Nothing was executed.");
    return;
  }

  print_banner();
  print_success("Installation successful");
  print_stat("Backend", report.backend.as_str());
  print_stat("Launcher", &report.launcher.display().to_string());
  if let Some(config) = &report.config_file {
    print_stat("Config", &config.display().to_string());
  }
  print_stat("Time", &format_duration(elapsed));
  println!();
  print_info(&format!("Run {} to start Scipion.", report.launcher.display()));
}
