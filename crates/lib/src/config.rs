//! Resolved installation settings.
//!
//! An [`InstallConfig`] is built once from user input and never mutated. Plan
//! builders are pure functions of this structure plus host probe results, so
//! every choice (prompts included) must be settled before one is constructed.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::consts::DEVEL_BRANCH;

/// Errors raised while assembling an [`InstallConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("installation path must be absolute: {}", path.display())]
  RelativeHome { path: PathBuf },
}

/// Which environment backend the user asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendChoice {
  /// Prefer conda when it is installed, fall back to a venv.
  #[default]
  AutoDetect,
  ForceConda,
  ForceVenv,
}

/// Network transport used for `git clone`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
  #[default]
  Ssh,
  Https,
}

/// Independently toggleable components installed after the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OptionalModules {
  /// The xmipp image-processing bundle.
  pub xmipp: bool,
}

impl Default for OptionalModules {
  fn default() -> Self {
    Self { xmipp: true }
  }
}

impl OptionalModules {
  pub fn any(&self) -> bool {
    self.xmipp
  }
}

/// Branch checked out for each group of repositories in devel mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branches {
  pub core: String,
  pub module: String,
}

impl Default for Branches {
  fn default() -> Self {
    Self {
      core: DEVEL_BRANCH.to_string(),
      module: DEVEL_BRANCH.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallConfig {
  /// Absolute installation root.
  pub home: PathBuf,
  pub backend: BackendChoice,
  /// Explicit environment name; `None` uses the backend default.
  pub env_name: Option<String>,
  /// Clone sources and install them editable instead of using published packages.
  pub devel: bool,
  pub modules: OptionalModules,
  pub transport: Transport,
  /// Suppress every prompt and assume "yes".
  pub no_ask: bool,
  /// Build and print plans, never execute them.
  pub dry_run: bool,
  pub branches: Branches,
  /// Job count handed to build steps.
  pub parallelism: NonZeroUsize,
  /// Optional fast scratch directory recorded in the config file.
  pub scratch: Option<PathBuf>,
}

impl InstallConfig {
  /// Create a configuration with defaults for everything but the root.
  ///
  /// # Errors
  ///
  /// Returns [`ConfigError::RelativeHome`] if `home` is not absolute.
  pub fn new(home: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    let home = home.into();
    if !home.is_absolute() {
      return Err(ConfigError::RelativeHome { path: home });
    }

    Ok(Self {
      home,
      backend: BackendChoice::default(),
      env_name: None,
      devel: false,
      modules: OptionalModules::default(),
      transport: Transport::default(),
      no_ask: false,
      dry_run: false,
      branches: Branches::default(),
      parallelism: default_parallelism(),
      scratch: None,
    })
  }

  pub fn home(&self) -> &Path {
    &self.home
  }
}

/// Number of jobs used when none is given: the host's available parallelism.
pub fn default_parallelism() -> NonZeroUsize {
  std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
