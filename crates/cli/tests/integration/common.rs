//! Shared helpers: an isolated `$PATH` populated with fake programs.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Fake `python3` that understands `-m venv <name>`.
const FAKE_PYTHON3: &str = r#"
if [ "$1" = "-m" ] && [ "$2" = "venv" ]; then
  mkdir -p "$3/bin"
  echo ': fake activate' > "$3/bin/activate"
fi
"#;

/// Fake `git` whose `clone` creates the target folder.
const FAKE_GIT: &str = r#"
if [ "$1" = "clone" ]; then
  for last; do :; done
  mkdir -p "$last"
fi
"#;

/// Isolated test environment.
///
/// `bin` is the only directory on `$PATH`; every fake program appends its
/// command line to `calls.log` before running its body.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// An environment with `mkdir` and no other programs.
  pub fn empty() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    fs::create_dir_all(env.bin()).unwrap();

    let mkdir = ["/bin/mkdir", "/usr/bin/mkdir"]
      .into_iter()
      .map(Path::new)
      .find(|p| p.exists())
      .expect("mkdir not found");
    std::os::unix::fs::symlink(mkdir, env.bin().join("mkdir")).unwrap();
    env
  }

  /// Every program a venv install touches, all succeeding.
  pub fn venv_host() -> Self {
    let env = Self::empty();
    env.fake("python3", FAKE_PYTHON3);
    env.fake("pip", "");
    env.fake("git", FAKE_GIT);
    env
  }

  pub fn bin(&self) -> PathBuf {
    self.temp.path().join("bin")
  }

  /// Installation root; not created.
  pub fn home(&self) -> PathBuf {
    self.temp.path().join("scipion")
  }

  /// Install an executable `name` running `body` after logging its arguments.
  pub fn fake(&self, name: &str, body: &str) {
    let path = self.bin().join(name);
    let log = self.temp.path().join("calls.log");
    let script = format!("#!/bin/sh\necho \"{} $*\" >> {:?}\n{}\n", name, log, body);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  }

  /// Every fake program invocation so far, one per line.
  pub fn calls(&self) -> String {
    fs::read_to_string(self.temp.path().join("calls.log")).unwrap_or_default()
  }

  /// The binary, pointed at `home()` with only `bin()` on `$PATH`.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("installscipion");
    cmd
      .arg(self.home())
      .env("PATH", self.bin())
      .env("SHELL", "/bin/bash")
      .env_remove("CONDA_ACTIVATION_CMD")
      .env_remove("RUST_LOG");
    cmd
  }
}
