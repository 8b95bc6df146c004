//! Top-level installation sequencing.
//!
//! A run walks `Init → DirectoryReady → EnvironmentReady → CoreInstalled →
//! OptionalInstalled → Finalized`. Any error ends it in `Failed`, a refused
//! confirmation or an interrupt ends it in `Cancelled`. Nothing is retried and
//! nothing already done is undone.

mod types;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use types::{InstallError, InstallOutcome, InstallReport, InstallState, Reporter};

use crate::backend::{self, Backend};
use crate::config::InstallConfig;
use crate::consts::GIT;
use crate::execute::{INTERRUPTED, ProcessRunner, execute};
use crate::host::{HostEnvironment, HostProbe};
use crate::launcher::{self, ArtifactError};
use crate::plan::{CommandPlan, PlanBuilder, PlanSet, shell_quote};
use crate::repo::Checkouts;

const CONDA_WARNING: &str =
  "Conda installations will have a poor font and may affect your user experience. Are you sure you want to continue?";

/// Runs one installation against injected host capabilities.
pub struct Installer<'a> {
  config: &'a InstallConfig,
  host: &'a HostEnvironment,
  probe: &'a HostProbe,
  checkouts: &'a dyn Checkouts,
  runner: &'a dyn ProcessRunner,
}

impl<'a> Installer<'a> {
  pub fn new(
    config: &'a InstallConfig,
    host: &'a HostEnvironment,
    probe: &'a HostProbe,
    checkouts: &'a dyn Checkouts,
    runner: &'a dyn ProcessRunner,
  ) -> Self {
    Self {
      config,
      host,
      probe,
      checkouts,
      runner,
    }
  }

  /// Run the installation to a terminal state.
  pub fn run(&self, reporter: &mut dyn Reporter) -> InstallOutcome {
    let mut state = InstallState::Init;

    match self.drive(reporter, &mut state) {
      Ok(report) => {
        info!(backend = %report.backend, dry_run = report.dry_run, "installation finished");
        InstallOutcome::Success(report)
      }
      Err(InstallError::UserCancelled { reason }) => {
        info!(during = %state, %reason, "installation cancelled");
        InstallOutcome::Cancelled { during: state, reason }
      }
      Err(error) => {
        warn!(during = %state, %error, "installation failed");
        InstallOutcome::Failed { during: state, error }
      }
    }
  }

  /// Build every plan without prompting, touching the filesystem or running anything.
  pub fn plans(&self) -> Result<PlanSet, InstallError> {
    let backend = backend::resolve(self.config.backend, self.probe).backend;
    let conda = self.check_prerequisites(backend)?;
    Ok(self.builder(backend, conda).plan_set())
  }

  fn builder(&self, backend: Backend, conda: Option<PathBuf>) -> PlanBuilder<'a> {
    PlanBuilder::new(self.config, backend, self.host, conda, self.checkouts)
  }

  fn drive(&self, reporter: &mut dyn Reporter, state: &mut InstallState) -> Result<InstallReport, InstallError> {
    let resolution = backend::resolve(self.config.backend, self.probe);
    if let Some(notice) = &resolution.notice {
      reporter.notice(notice);
    }
    let backend = resolution.backend;

    if backend == Backend::Conda {
      self.confirm(reporter, CONDA_WARNING, "Cancelling installation with conda.")?;
    }
    let conda = self.check_prerequisites(backend)?;

    self.prepare_home(reporter)?;
    advance(state, InstallState::DirectoryReady, reporter);

    let builder = self.builder(backend, conda);

    self.run_phase(reporter, "Creating the environment", builder.environment(true))?;
    advance(state, InstallState::EnvironmentReady, reporter);

    let mut core = builder.environment(false);
    core.append(builder.core_install());
    self.run_phase(reporter, "Installing core components", core)?;
    advance(state, InstallState::CoreInstalled, reporter);

    let optional = builder.optional_modules();
    if optional.is_empty() {
      info!("no optional modules selected");
    } else {
      let mut plan = builder.environment(false);
      plan.append(optional);
      self.run_phase(reporter, "Installing optional modules", plan)?;
    }
    advance(state, InstallState::OptionalInstalled, reporter);

    let report = self.finalize(&builder, reporter)?;
    advance(state, InstallState::Finalized, reporter);
    Ok(report)
  }

  /// Fail before touching anything if a required program is missing.
  ///
  /// Returns the conda binary when conda is the backend.
  fn check_prerequisites(&self, backend: Backend) -> Result<Option<PathBuf>, InstallError> {
    let program = self.probe.require(backend.program())?;
    if self.config.devel {
      self.probe.require(GIT)?;
    }
    Ok((backend == Backend::Conda).then_some(program))
  }

  fn confirm(&self, reporter: &mut dyn Reporter, question: &str, refusal: &str) -> Result<(), InstallError> {
    let accepted = self.config.no_ask || reporter.confirm(question);
    self.check_interrupt()?;
    if accepted {
      Ok(())
    } else {
      Err(InstallError::cancelled(refusal))
    }
  }

  /// Stop before starting anything new once an interrupt has been received.
  fn check_interrupt(&self) -> Result<(), InstallError> {
    if self.runner.interrupted() {
      Err(InstallError::cancelled(INTERRUPTED))
    } else {
      Ok(())
    }
  }

  fn prepare_home(&self, reporter: &mut dyn Reporter) -> Result<(), InstallError> {
    let home = self.config.home();
    if home.is_dir() {
      return Ok(());
    }
    if home.exists() {
      return Err(InstallError::DirectoryCreationDenied {
        path: home.to_path_buf(),
        reason: "a file with that name already exists".to_string(),
      });
    }

    self.confirm(
      reporter,
      &format!("path {} does not exist. Shall I create it?", home.display()),
      &format!("Cannot continue without creating {}", home.display()),
    )?;

    if self.config.dry_run {
      reporter.notice(&format!("{} would be created.", home.display()));
      return Ok(());
    }

    fs::create_dir_all(home).map_err(|e| InstallError::DirectoryCreationDenied {
      path: home.to_path_buf(),
      reason: format!("{}. Please verify that you have permissions to create it", e),
    })?;
    info!(home = %home.display(), "installation folder created");
    Ok(())
  }

  fn run_phase(&self, reporter: &mut dyn Reporter, title: &str, plan: CommandPlan) -> Result<(), InstallError> {
    self.check_interrupt()?;
    reporter.plan(title, &plan);
    execute(&plan, self.config.dry_run, self.runner, reporter.output())?;
    Ok(())
  }

  fn finalize(&self, builder: &PlanBuilder<'_>, reporter: &mut dyn Reporter) -> Result<InstallReport, InstallError> {
    self.check_interrupt()?;
    let home = self.config.home();
    let backend = builder.backend();

    let launcher_text =
      launcher::render_launcher(backend, &builder.activation_line()).map_err(ArtifactError::from)?;
    let config_text = launcher::render_config(builder.conda_init_line(), self.config.scratch.as_deref())
      .map_err(ArtifactError::from)?;

    let launcher_path = launcher::launcher_path(home);
    let config_file = config_text.as_ref().map(|_| launcher::config_path(home));

    if self.config.dry_run {
      let out = reporter.output();
      preview(out, "An executable launcher", &launcher_path, &launcher_text)?;
      writeln!(out, "chmod 755 {}", shell_quote(&launcher_path.to_string_lossy()))?;
      if let (Some(path), Some(text)) = (&config_file, &config_text) {
        preview(out, "A config file", path, text)?;
      }
    } else {
      launcher::write_launcher(&launcher_path, &launcher_text)?;
      if let (Some(path), Some(text)) = (&config_file, &config_text) {
        launcher::write_config(path, text)?;
      }
    }

    Ok(InstallReport {
      backend,
      launcher: launcher_path,
      config_file,
      dry_run: self.config.dry_run,
    })
  }
}

fn advance(state: &mut InstallState, next: InstallState, reporter: &mut dyn Reporter) {
  debug_assert!(next > *state, "{next} does not follow {state}");
  info!(from = %state, to = %next, "state transition");
  *state = next;
  reporter.progress(next);
}

fn preview(out: &mut dyn Write, what: &str, path: &Path, text: &str) -> std::io::Result<()> {
  let rule = "_".repeat(40);
  writeln!(out, "{} would be created at {} with the following content:", what, path.display())?;
  writeln!(out, "{}", rule)?;
  writeln!(out, "{}", text.trim_end())?;
  writeln!(out, "{}", rule)
}
