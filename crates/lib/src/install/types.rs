//! States, errors and outcomes of an installation run.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::Backend;
use crate::execute::{ExecuteError, INTERRUPTED};
use crate::host::ProbeError;
use crate::launcher::ArtifactError;
use crate::plan::CommandPlan;

/// Progress of a run. Transitions only move forward, one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstallState {
  Init,
  DirectoryReady,
  EnvironmentReady,
  CoreInstalled,
  OptionalInstalled,
  Finalized,
}

impl InstallState {
  /// What the run is doing while it sits in this state.
  pub fn activity(&self) -> &'static str {
    match self {
      InstallState::Init => "preparing the installation folder",
      InstallState::DirectoryReady => "creating the environment",
      InstallState::EnvironmentReady => "installing the core components",
      InstallState::CoreInstalled => "installing optional modules",
      InstallState::OptionalInstalled => "writing the launcher",
      InstallState::Finalized => "finishing",
    }
  }
}

impl fmt::Display for InstallState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      InstallState::Init => "init",
      InstallState::DirectoryReady => "directory-ready",
      InstallState::EnvironmentReady => "environment-ready",
      InstallState::CoreInstalled => "core-installed",
      InstallState::OptionalInstalled => "optional-installed",
      InstallState::Finalized => "finalized",
    };
    f.write_str(name)
  }
}

/// Every way an installation can stop early.
#[derive(Debug, Error)]
pub enum InstallError {
  /// A required program is not on `$PATH`.
  #[error("{name} command not found.")]
  PrerequisiteMissing { name: String },

  #[error("cannot create {}: {reason}", path.display())]
  DirectoryCreationDenied { path: PathBuf, reason: String },

  /// The user declined a required confirmation or interrupted the run.
  #[error("{reason}")]
  UserCancelled { reason: String },

  /// A plan's compound command exited non-zero.
  #[error("something went wrong running:\n{command}")]
  StepFailed { code: Option<i32>, command: String },

  #[error("failed to start shell: {0}")]
  Spawn(#[source] io::Error),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

impl InstallError {
  pub fn cancelled(reason: impl Into<String>) -> Self {
    InstallError::UserCancelled { reason: reason.into() }
  }

  pub fn is_cancellation(&self) -> bool {
    matches!(self, InstallError::UserCancelled { .. })
  }
}

impl From<ProbeError> for InstallError {
  fn from(err: ProbeError) -> Self {
    match err {
      ProbeError::PrerequisiteMissing { name } => InstallError::PrerequisiteMissing { name },
    }
  }
}

impl From<ExecuteError> for InstallError {
  fn from(err: ExecuteError) -> Self {
    match err {
      ExecuteError::StepFailed { code, command } => InstallError::StepFailed { code, command },
      ExecuteError::Interrupted { .. } => InstallError::cancelled(INTERRUPTED),
      ExecuteError::Spawn(source) => InstallError::Spawn(source),
      ExecuteError::Io(source) => InstallError::Io(source),
    }
  }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
  pub backend: Backend,
  pub launcher: PathBuf,
  /// `None` when there was nothing to put in the config file.
  pub config_file: Option<PathBuf>,
  pub dry_run: bool,
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum InstallOutcome {
  Success(InstallReport),
  /// Stopped on user request; not a fault.
  Cancelled { during: InstallState, reason: String },
  Failed { during: InstallState, error: InstallError },
}

impl InstallOutcome {
  pub fn is_success(&self) -> bool {
    matches!(self, InstallOutcome::Success(_))
  }
}

/// Interaction with whoever is watching the run.
pub trait Reporter {
  /// Ask a yes/no question. Anything but an explicit yes is a no.
  fn confirm(&mut self, question: &str) -> bool;

  /// Informational message.
  fn notice(&mut self, message: &str);

  /// A new state was reached.
  fn progress(&mut self, _state: InstallState) {}

  /// A plan is about to run (or be printed, in dry-run mode).
  fn plan(&mut self, _title: &str, _plan: &CommandPlan) {}

  /// Sink for dry-run plan text and file previews. Flushed before each
  /// external command so output stays in order.
  fn output(&mut self) -> &mut dyn Write;
}
