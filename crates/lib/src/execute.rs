//! Plan execution.
//!
//! A plan runs as one blocking shell invocation. There is no timeout and no
//! retry; the first failing step stops the shell and the whole plan fails.

use std::io::{self, Write};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info};

use crate::plan::CommandPlan;

/// Exit status conventionally reported by shells for a SIGINT'd child.
const SIGINT_EXIT: i32 = 130;

/// Reason reported when a run stops because of an interrupt.
pub const INTERRUPTED: &str = "Installation interrupted.";

#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The compound command exited non-zero.
  #[error("command failed with exit code {code:?}:\n{command}")]
  StepFailed { code: Option<i32>, command: String },

  /// The shell was interrupted before the plan completed.
  #[error("interrupted while running:\n{command}")]
  Interrupted { command: String },

  #[error("failed to start shell: {0}")]
  Spawn(#[source] io::Error),

  #[error("io error: {0}")]
  Io(#[from] io::Error),
}

/// How a shell invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
  Exited(i32),
  /// Killed by a signal other than an interrupt.
  Signaled,
  Interrupted,
}

impl RunStatus {
  pub fn success(&self) -> bool {
    matches!(self, RunStatus::Exited(0))
  }

  pub fn code(&self) -> Option<i32> {
    match self {
      RunStatus::Exited(code) => Some(*code),
      RunStatus::Signaled | RunStatus::Interrupted => None,
    }
  }
}

/// Runs one shell script to completion.
pub trait ProcessRunner {
  fn run(&self, script: &str) -> io::Result<RunStatus>;

  /// Whether an interrupt has been received. Checked before each phase so
  /// nothing new starts once the user asked to stop.
  fn interrupted(&self) -> bool {
    false
  }
}

/// Runs scripts with a POSIX shell, inheriting stdio.
#[derive(Debug, Clone)]
pub struct ShellRunner {
  shell: String,
  interrupted: Option<Arc<AtomicBool>>,
}

impl Default for ShellRunner {
  fn default() -> Self {
    Self {
      shell: "/bin/sh".to_string(),
      interrupted: None,
    }
  }
}

impl ShellRunner {
  /// Use `shell` instead of `/bin/sh`. It must accept `-c <script>`.
  pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
    self.shell = shell.into();
    self
  }

  /// Flag raised by an interrupt handler. Once set, no further script is
  /// spawned and a run in progress is reported as interrupted.
  pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
    self.interrupted = Some(flag);
    self
  }
}

impl ProcessRunner for ShellRunner {
  fn run(&self, script: &str) -> io::Result<RunStatus> {
    if self.interrupted() {
      debug!("interrupt pending, not spawning");
      return Ok(RunStatus::Interrupted);
    }

    debug!(shell = %self.shell, "spawning shell");
    let status = Command::new(&self.shell).arg("-c").arg(script).status()?;

    if self.interrupted() {
      return Ok(RunStatus::Interrupted);
    }

    match status.code() {
      Some(SIGINT_EXIT) => Ok(RunStatus::Interrupted),
      Some(code) => Ok(RunStatus::Exited(code)),
      None => Ok(signal_status(&status)),
    }
  }

  fn interrupted(&self) -> bool {
    self.interrupted.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst))
  }
}

#[cfg(unix)]
fn signal_status(status: &std::process::ExitStatus) -> RunStatus {
  use std::os::unix::process::ExitStatusExt;

  // SIGINT
  if status.signal() == Some(2) {
    RunStatus::Interrupted
  } else {
    RunStatus::Signaled
  }
}

#[cfg(not(unix))]
fn signal_status(_status: &std::process::ExitStatus) -> RunStatus {
  RunStatus::Signaled
}

/// Execute `plan` as a single compound command.
///
/// In dry-run mode the joined command is written to `out` and nothing runs.
/// Otherwise `out` is flushed and the shell is invoked, blocking until it
/// exits. An empty plan succeeds without invoking anything.
///
/// # Errors
///
/// [`ExecuteError::StepFailed`] carries the whole compound command; the shell
/// output up to the failure identifies the step.
pub fn execute(
  plan: &CommandPlan,
  dry_run: bool,
  runner: &dyn ProcessRunner,
  out: &mut dyn Write,
) -> Result<(), ExecuteError> {
  if plan.is_empty() {
    return Ok(());
  }

  let command = plan.to_compound();

  if dry_run {
    writeln!(out, "{}", command)?;
    return Ok(());
  }

  out.flush()?;
  info!(steps = plan.len(), "executing plan");
  debug!(command = %command, "compound command");

  let status = runner.run(&command).map_err(ExecuteError::Spawn)?;
  match status {
    RunStatus::Exited(0) => Ok(()),
    RunStatus::Interrupted => Err(ExecuteError::Interrupted { command }),
    other => Err(ExecuteError::StepFailed {
      code: other.code(),
      command,
    }),
  }
}
