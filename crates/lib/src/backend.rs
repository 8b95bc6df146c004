//! Environment backend selection.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::BackendChoice;
use crate::consts::{CONDA, CONDA_ENV_NAME, PYTHON3, VENV_NAME};
use crate::host::HostProbe;

/// The two interchangeable ways of isolating the installed interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
  /// A named conda environment with its own interpreter.
  Conda,
  /// A `python3 -m venv` environment layered on the host interpreter.
  Venv,
}

impl Backend {
  /// Program that must be on `$PATH` to create this kind of environment.
  pub fn program(&self) -> &'static str {
    match self {
      Backend::Conda => CONDA,
      Backend::Venv => PYTHON3,
    }
  }

  pub fn default_env_name(&self) -> &'static str {
    match self {
      Backend::Conda => CONDA_ENV_NAME,
      Backend::Venv => VENV_NAME,
    }
  }

  /// Variable that is set while an environment of this kind is active.
  pub fn active_env_var(&self) -> &'static str {
    match self {
      Backend::Conda => "CONDA_DEFAULT_ENV",
      Backend::Venv => "VIRTUAL_ENV",
    }
  }

  /// Interpreter name used inside the activated environment.
  pub fn interpreter(&self) -> &'static str {
    match self {
      Backend::Conda => "python",
      Backend::Venv => PYTHON3,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Backend::Conda => "conda",
      Backend::Venv => "venv",
    }
  }
}

impl fmt::Display for Backend {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResolution {
  pub backend: Backend,
  /// Set when conda was picked by preference rather than by request.
  pub notice: Option<String>,
}

/// Pick the environment backend.
///
/// Forced choices are returned without probing. Otherwise conda wins when it
/// is installed and a venv is used when it is not.
pub fn resolve(choice: BackendChoice, probe: &HostProbe) -> BackendResolution {
  let backend = match choice {
    BackendChoice::ForceConda => Backend::Conda,
    BackendChoice::ForceVenv => Backend::Venv,
    BackendChoice::AutoDetect => {
      if probe.lookup(CONDA).is_some() {
        let notice = "conda detected, using it by default. Pass --venv to use a virtual environment instead.";
        info!(backend = %Backend::Conda, "backend chosen by default");
        return BackendResolution {
          backend: Backend::Conda,
          notice: Some(notice.to_string()),
        };
      }
      warn!(program = CONDA, "not found, falling back to a virtual environment");
      Backend::Venv
    }
  };

  info!(backend = %backend, ?choice, "backend resolved");
  BackendResolution { backend, notice: None }
}
