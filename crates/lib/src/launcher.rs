//! Launcher script and config file produced at the end of an installation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::backend::Backend;
use crate::consts::{
  ACTIVATION_OVERRIDE_VAR, CONFIG_DIR, CONFIG_NAME, CONFIG_SECTION, LAUNCHER_NAME, SCRATCH_KEY,
};
use crate::template::{self, TemplateError};

/// Python launcher with `VIRTUAL_ENV_VAR`, `ACTIVATE_ENV_CMD` and
/// `PYTHON_PROGRAM` placeholders.
pub const LAUNCHER_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/launcher.py"));

/// Single-section config file with `SECTION` and `ENTRIES` placeholders.
pub const CONFIG_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/scipion.conf"));

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("template error: {0}")]
  Template(#[from] TemplateError),

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },

  #[error("failed to set permissions on {}: {source}", path.display())]
  Permissions { path: PathBuf, source: std::io::Error },
}

pub fn launcher_path(home: &Path) -> PathBuf {
  home.join(LAUNCHER_NAME)
}

pub fn config_path(home: &Path) -> PathBuf {
  home.join(CONFIG_DIR).join(CONFIG_NAME)
}

/// Escape `text` for a single-quoted Python string literal.
fn python_quoted(text: &str) -> String {
  text.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Render the launcher for `backend`, activating with `activation_line`.
pub fn render_launcher(backend: Backend, activation_line: &str) -> Result<String, TemplateError> {
  let values = BTreeMap::from([
    ("VIRTUAL_ENV_VAR", backend.active_env_var().to_string()),
    ("ACTIVATE_ENV_CMD", python_quoted(activation_line)),
    ("PYTHON_PROGRAM", backend.interpreter().to_string()),
  ]);
  template::render(LAUNCHER_TEMPLATE, &values)
}

/// Render the config file, or `None` when there is nothing to record.
pub fn render_config(activation: Option<&str>, scratch: Option<&Path>) -> Result<Option<String>, TemplateError> {
  let mut entries = Vec::new();
  if let Some(cmd) = activation.filter(|c| !c.is_empty()) {
    entries.push(format!("{} = {}", ACTIVATION_OVERRIDE_VAR, cmd));
  }
  if let Some(scratch) = scratch.filter(|p| !p.as_os_str().is_empty()) {
    entries.push(format!("{} = {}", SCRATCH_KEY, scratch.display()));
  }

  if entries.is_empty() {
    return Ok(None);
  }

  let values = BTreeMap::from([
    ("SECTION", CONFIG_SECTION.to_string()),
    ("ENTRIES", entries.join("\n")),
  ]);
  template::render(CONFIG_TEMPLATE, &values).map(Some)
}

/// Write the launcher and make it executable.
pub fn write_launcher(path: &Path, content: &str) -> Result<(), ArtifactError> {
  fs::write(path, content).map_err(|source| ArtifactError::WriteFile {
    path: path.to_path_buf(),
    source,
  })?;
  make_executable(path)?;
  debug!(path = %path.display(), "launcher written");
  Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), ArtifactError> {
  use std::os::unix::fs::PermissionsExt;

  fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| ArtifactError::Permissions {
    path: path.to_path_buf(),
    source,
  })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), ArtifactError> {
  Ok(())
}

/// Write the config file, creating its directory.
pub fn write_config(path: &Path, content: &str) -> Result<(), ArtifactError> {
  if let Some(dir) = path.parent() {
    fs::create_dir_all(dir).map_err(|source| ArtifactError::CreateDir {
      path: dir.to_path_buf(),
      source,
    })?;
  }
  fs::write(path, content).map_err(|source| ArtifactError::WriteFile {
    path: path.to_path_buf(),
    source,
  })?;
  debug!(path = %path.display(), "config written");
  Ok(())
}
