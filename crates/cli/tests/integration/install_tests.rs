//! Install command integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;

use predicates::prelude::*;

use super::common::TestEnv;

const TROUBLESHOOTING: &str = "https://scipion-em.github.io/docs/docs/scipion-modes/troubleshooting";

// =============================================================================
// Dry run
// =============================================================================

#[test]
fn dry_run_prints_every_phase_and_creates_nothing() {
  let env = TestEnv::venv_host();

  env
    .cmd()
    .args(["--venv", "--dry-run", "--no-ask"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Creating the environment"))
    .stdout(predicate::str::contains("python3 -m venv .scipion3env &&\n"))
    .stdout(predicate::str::contains("pip install scipion-pyworkflow &&\npip install scipion-app"))
    .stdout(predicate::str::contains("installp -p scipion-em-xmipp"))
    .stdout(predicate::str::contains("An executable launcher would be created at"))
    .stdout(predicate::str::contains("Dry run complete"));

  assert!(!env.home().exists());
  assert_eq!(env.calls(), "");
}

#[test]
fn dry_run_json_lists_plans_per_phase() {
  let env = TestEnv::venv_host();

  let output = env
    .cmd()
    .args(["--dev", "--use-https", "--dry-run", "--format", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(doc["plans"]["backend"], "venv");
  assert_eq!(doc["config"]["devel"], true);

  let core: Vec<&str> = doc["plans"]["core"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s.as_str().unwrap())
    .collect();
  assert!(core.contains(&"git clone -b devel https://github.com/scipion-em/scipion-pyworkflow.git scipion-pyworkflow"));
  assert!(core.contains(&"pip install -e scipion-app"));

  assert!(!env.home().exists());
}

// =============================================================================
// Pre-flight failures
// =============================================================================

#[test]
fn missing_git_in_devel_mode_fails_before_touching_disk() {
  let env = TestEnv::empty();
  env.fake("python3", "");

  env
    .cmd()
    .args(["--dev", "--no-ask"])
    .assert()
    .code(255)
    .stderr(predicate::str::contains("git command not found"))
    .stderr(predicate::str::contains(TROUBLESHOOTING));

  assert!(!env.home().exists());
  assert_eq!(env.calls(), "");
}

#[test]
fn forced_conda_without_conda_fails() {
  let env = TestEnv::venv_host();

  env
    .cmd()
    .args(["--conda", "--no-ask"])
    .assert()
    .code(255)
    .stderr(predicate::str::contains("conda command not found"));
}

#[test]
fn prompt_without_terminal_cancels() {
  let env = TestEnv::venv_host();

  env
    .cmd()
    .arg("--venv")
    .assert()
    .code(255)
    .stderr(predicate::str::contains("non-interactive"))
    .stderr(predicate::str::contains("Installation cancelled"));

  assert!(!env.home().exists());
}

// =============================================================================
// Live runs
// =============================================================================

#[test]
fn venv_install_writes_executable_launcher() {
  let env = TestEnv::venv_host();

  env
    .cmd()
    .args(["--venv", "--no-ask", "--scratch-path", "/scratch"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Installation successful"));

  let launcher = env.home().join("scipion3");
  let text = fs::read_to_string(&launcher).unwrap();
  assert!(!text.contains("{{"));
  assert!(text.contains("VIRTUAL_ENV"));
  assert_eq!(fs::metadata(&launcher).unwrap().permissions().mode() & 0o777, 0o755);

  let config = fs::read_to_string(env.home().join("config").join("scipion.conf")).unwrap();
  assert_eq!(config, "[PYWORKFLOW]\nSCIPION_SCRATCH = /scratch\n");

  assert!(env.home().join("software").join("em").is_dir());
  assert!(env.home().join(".scipion3env").join("bin").join("activate").is_file());

  let calls = env.calls();
  assert!(calls.contains("python3 -m venv .scipion3env"));
  assert!(calls.contains("pip install scipion-pyworkflow\npip install scipion-app"));
  assert!(calls.contains("python3 -m scipion installp -p scipion-em-xmipp"));
}

#[test]
fn devel_install_clones_and_builds_optional_module() {
  let env = TestEnv::venv_host();

  env
    .cmd()
    .args(["--venv", "--dev", "--no-ask", "-j", "2"])
    .assert()
    .success();

  let calls = env.calls();
  assert!(calls.contains("git clone -b devel git@github.com:scipion-em/scipion-pyworkflow.git scipion-pyworkflow"));
  assert!(calls.contains("pip install -e scipion-em"));
  assert!(calls.contains("git clone -b devel git@github.com:I2PC/xmipp.git xmipp-bundle"));
  assert!(calls.contains("python3 xmipp compileAndInstall N=2"));
  assert!(!env.home().join("config").exists());
}

#[test]
fn second_devel_run_updates_existing_checkouts() {
  let env = TestEnv::venv_host();
  env.cmd().args(["--venv", "--dev", "--no-ask", "--no-optional-module"]).assert().success();
  let first = env.calls();

  env.cmd().args(["--venv", "--dev", "--no-ask", "--no-optional-module"]).assert().success();
  let calls = env.calls();
  let second = &calls[first.len()..];

  assert!(!second.contains("git clone"));
  assert_eq!(second.matches("git pull").count(), 3);
}

#[test]
fn failing_step_reports_phase_and_command() {
  let env = TestEnv::venv_host();
  env.fake("pip", "exit 1");

  env
    .cmd()
    .args(["--venv", "--no-ask"])
    .assert()
    .code(255)
    .stderr(predicate::str::contains("Installation failed while installing the core components"))
    .stderr(predicate::str::contains("pip install scipion-pyworkflow"))
    .stderr(predicate::str::contains(TROUBLESHOOTING));

  assert!(!env.home().join("scipion3").exists());
}
