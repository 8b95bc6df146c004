//! Host capabilities: executable lookup and the shell environment.
//!
//! Process-wide state (`$SHELL`, `$CONDA_ACTIVATION_CMD`, `$PATH`) is read
//! once into these objects and passed around explicitly, so tests can
//! substitute any of it.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::{ACTIVATION_OVERRIDE_VAR, DEFAULT_SHELL, SHELL_VAR};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
  #[error("{name} command not found")]
  PrerequisiteMissing { name: String },
}

/// Answers "where is program P" for the executable search path.
pub trait ProgramLocator {
  fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Looks programs up on `$PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathLocator;

impl ProgramLocator for PathLocator {
  fn locate(&self, name: &str) -> Option<PathBuf> {
    which::which(name).ok()
  }
}

/// Cached program availability for the lifetime of one run.
pub struct HostProbe {
  locator: Box<dyn ProgramLocator>,
  cache: RefCell<HashMap<String, Option<PathBuf>>>,
}

impl HostProbe {
  pub fn new(locator: impl ProgramLocator + 'static) -> Self {
    Self {
      locator: Box::new(locator),
      cache: RefCell::new(HashMap::new()),
    }
  }

  /// Probe using the real `$PATH`.
  pub fn system() -> Self {
    Self::new(PathLocator)
  }

  /// Resolve `name`, consulting the locator at most once per name.
  pub fn lookup(&self, name: &str) -> Option<PathBuf> {
    if let Some(found) = self.cache.borrow().get(name) {
      return found.clone();
    }

    let found = self.locator.locate(name);
    debug!(program = name, path = ?found, "probed program");
    self.cache.borrow_mut().insert(name.to_string(), found.clone());
    found
  }

  /// Check that `name` is invocable.
  ///
  /// A missing program is an error when `required`, otherwise `Ok(None)` so
  /// callers can skip or substitute behavior.
  pub fn check(&self, name: &str, required: bool) -> Result<Option<PathBuf>, ProbeError> {
    match self.lookup(name) {
      Some(path) => Ok(Some(path)),
      None if required => Err(ProbeError::PrerequisiteMissing { name: name.to_string() }),
      None => Ok(None),
    }
  }

  pub fn require(&self, name: &str) -> Result<PathBuf, ProbeError> {
    self
      .check(name, true)?
      .ok_or_else(|| ProbeError::PrerequisiteMissing { name: name.to_string() })
  }
}

/// Shell identity and activation override captured from the environment.
#[derive(Debug, Clone)]
pub struct HostEnvironment {
  shell: String,
  activation_override: Option<String>,
  conda_init: OnceCell<String>,
}

impl HostEnvironment {
  /// `shell` may be a full path (as `$SHELL` usually is); only its file name
  /// is kept. An empty override counts as no override.
  pub fn new(shell: Option<&str>, activation_override: Option<String>) -> Self {
    let shell = shell
      .and_then(|s| Path::new(s).file_name())
      .and_then(|n| n.to_str())
      .filter(|n| !n.is_empty())
      .unwrap_or(DEFAULT_SHELL)
      .to_string();

    Self {
      shell,
      activation_override: activation_override.filter(|cmd| !cmd.trim().is_empty()),
      conda_init: OnceCell::new(),
    }
  }

  /// Read `$SHELL` and `$CONDA_ACTIVATION_CMD` from the process environment.
  pub fn from_process_env() -> Self {
    let shell = env::var(SHELL_VAR).ok();
    let activation_override = env::var(ACTIVATION_OVERRIDE_VAR).ok();
    Self::new(shell.as_deref(), activation_override)
  }

  /// Shell name, e.g. `bash` or `tcsh`.
  pub fn shell(&self) -> &str {
    &self.shell
  }

  pub fn is_csh_family(&self) -> bool {
    matches!(self.shell.as_str(), "csh" | "tcsh")
  }

  pub fn activation_override(&self) -> Option<&str> {
    self.activation_override.as_deref()
  }

  /// The line that makes `conda activate` usable in a fresh shell.
  ///
  /// Resolved on first use and cached. An explicit override wins over shell
  /// detection; csh-family shells source conda's profile script, every other
  /// shell evaluates conda's shell hook.
  pub fn conda_init_line(&self, conda: &Path) -> &str {
    self.conda_init.get_or_init(|| {
      if let Some(line) = &self.activation_override {
        return line.clone();
      }

      if self.is_csh_family() {
        let root = conda.ancestors().nth(2).unwrap_or(conda);
        format!("source {}", root.join("etc/profile.d/conda.csh").display())
      } else {
        format!("eval \"$({} shell.{} hook)\"", conda.display(), self.shell)
      }
    })
  }
}
