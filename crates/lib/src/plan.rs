//! Command plan construction.
//!
//! Builders here only produce strings. Nothing is executed and the only
//! outside state consulted is what was probed before the builder was
//! created, plus the [`Checkouts`] seam for devel-mode repository folders.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backend::Backend;
use crate::config::InstallConfig;
use crate::consts::{CMD_SEP, CONDA, CONDA_PYTHON, HOME_VAR, PIP, PYTHON3, SCAFFOLD_DIRS};
use crate::host::HostEnvironment;
use crate::repo::{self, CORE_REPOSITORIES, Checkouts, XMIPP_BUNDLE};

/// Published packages installed in stable mode, in dependency order.
pub const STABLE_CORE_PACKAGES: [&str; 2] = ["scipion-pyworkflow", "scipion-app"];

/// Plugin providing the scipion side of the xmipp bundle.
pub const XMIPP_PLUGIN: &str = "scipion-em-xmipp";

/// Quote `text` as one POSIX shell word.
///
/// Words made only of safe characters are returned as is; anything else is
/// single-quoted, so `$`, backticks and control characters stay literal.
pub fn shell_quote(text: &str) -> String {
  if !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || "-_=./:@+,".contains(c)) {
    text.to_string()
  } else {
    format!("'{}'", text.replace('\'', "'\\''"))
  }
}

fn quote_path(path: &Path) -> String {
  shell_quote(&path.to_string_lossy())
}

/// Ordered shell steps that run as one AND-joined compound command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandPlan {
  steps: Vec<String>,
}

impl CommandPlan {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, step: impl Into<String>) {
    self.steps.push(step.into());
  }

  /// Append every step of `other` after the current ones.
  pub fn append(&mut self, other: CommandPlan) {
    self.steps.extend(other.steps);
  }

  pub fn steps(&self) -> &[String] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Join the steps so each one runs only if the previous succeeded.
  ///
  /// The result never ends with the separator.
  pub fn to_compound(&self) -> String {
    self.steps.join(CMD_SEP)
  }
}

impl Extend<String> for CommandPlan {
  fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
    self.steps.extend(iter);
  }
}

impl FromIterator<String> for CommandPlan {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Self {
      steps: iter.into_iter().collect(),
    }
  }
}

/// Every plan of one run, for previews.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSet {
  pub backend: Backend,
  pub environment: CommandPlan,
  pub core: CommandPlan,
  pub optional: CommandPlan,
}

/// Builds the plans for one installation.
pub struct PlanBuilder<'a> {
  config: &'a InstallConfig,
  backend: Backend,
  host: &'a HostEnvironment,
  /// Resolved conda binary, when conda is the backend and was found.
  conda: Option<PathBuf>,
  checkouts: &'a dyn Checkouts,
}

impl<'a> PlanBuilder<'a> {
  pub fn new(
    config: &'a InstallConfig,
    backend: Backend,
    host: &'a HostEnvironment,
    conda: Option<PathBuf>,
    checkouts: &'a dyn Checkouts,
  ) -> Self {
    Self {
      config,
      backend,
      host,
      conda,
      checkouts,
    }
  }

  pub fn backend(&self) -> Backend {
    self.backend
  }

  pub fn env_name(&self) -> &str {
    self
      .config
      .env_name
      .as_deref()
      .unwrap_or_else(|| self.backend.default_env_name())
  }

  /// Conda's shell init line, or `None` for a venv.
  pub fn conda_init_line(&self) -> Option<&str> {
    match self.backend {
      Backend::Conda => {
        let conda = self.conda.as_deref().unwrap_or(Path::new(CONDA));
        Some(self.host.conda_init_line(conda))
      }
      Backend::Venv => None,
    }
  }

  fn activate_command(&self) -> String {
    match self.backend {
      Backend::Conda => format!("{} activate {}", CONDA, shell_quote(self.env_name())),
      Backend::Venv => format!(
        ". {}",
        quote_path(&self.config.home().join(self.env_name()).join("bin").join("activate"))
      ),
    }
  }

  /// Single line that activates the environment from any POSIX shell.
  ///
  /// Used by the launcher, which runs it before every invocation.
  pub fn activation_line(&self) -> String {
    match self.conda_init_line() {
      Some(init) => format!("{} && {}", init, self.activate_command()),
      None => self.activate_command(),
    }
  }

  /// Create (when `create`) and activate the environment.
  ///
  /// The plan always ends with exactly one activation command. With `create`
  /// unset it only re-enters an existing environment for a later phase.
  pub fn environment(&self, create: bool) -> CommandPlan {
    let mut plan = CommandPlan::new();

    match self.backend {
      Backend::Conda => {
        if let Some(init) = self.conda_init_line() {
          plan.push(init);
        }
        if create {
          let yes = if self.config.no_ask { " -y" } else { "" };
          plan.push(format!(
            "{} create{} -n {} {}",
            CONDA,
            yes,
            shell_quote(self.env_name()),
            CONDA_PYTHON
          ));
        }
      }
      Backend::Venv => {
        if create {
          plan.push(self.cd_home());
          plan.push(format!("{} -m venv {}", PYTHON3, shell_quote(self.env_name())));
        }
      }
    }

    plan.push(self.activate_command());
    plan
  }

  /// Scaffold the installation root and install the core components.
  pub fn core_install(&self) -> CommandPlan {
    let mut plan = CommandPlan::new();
    plan.push(self.cd_home());
    plan.push(format!("mkdir -p {}", SCAFFOLD_DIRS.join(" ")));
    plan.push(format!("export {}={}", HOME_VAR, quote_path(self.config.home())));

    if self.config.devel {
      for spec in &CORE_REPOSITORIES {
        plan.extend(repo::sync(spec, self.config, self.checkouts));
      }
    } else {
      plan.extend(
        STABLE_CORE_PACKAGES
          .iter()
          .map(|package| format!("{} install {}", PIP, package)),
      );
    }

    plan
  }

  /// Install the optional modules, or nothing when none is enabled.
  pub fn optional_modules(&self) -> CommandPlan {
    let mut plan = CommandPlan::new();
    if !self.config.modules.xmipp {
      return plan;
    }

    let jobs = self.config.parallelism;
    let python = self.backend.interpreter();

    if self.config.devel {
      plan.push(self.cd_home());
      plan.extend(repo::sync(&XMIPP_BUNDLE, self.config, self.checkouts));
      plan.push(format!("cd {}", XMIPP_BUNDLE.folder));
      plan.push(format!(
        "{} xmipp get_devel_sources {}",
        python,
        XMIPP_BUNDLE.branch(&self.config.branches)
      ));
      plan.push(format!("{} xmipp config", python));
      plan.push(format!("{} install -e src/{}", PIP, XMIPP_PLUGIN));
      plan.push(format!("{} xmipp compileAndInstall N={}", python, jobs));
    } else {
      plan.push(format!(
        "{}={} {} -m scipion installp -p {} -j {}",
        HOME_VAR,
        quote_path(self.config.home()),
        python,
        XMIPP_PLUGIN,
        jobs
      ));
    }

    plan
  }

  /// All three plans, with the environment plan creating the environment.
  pub fn plan_set(&self) -> PlanSet {
    PlanSet {
      backend: self.backend,
      environment: self.environment(true),
      core: self.core_install(),
      optional: self.optional_modules(),
    }
  }

  fn cd_home(&self) -> String {
    format!("cd {}", quote_path(self.config.home()))
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;
  use std::num::NonZeroUsize;

  use super::*;

  struct Present(HashSet<PathBuf>);

  impl Checkouts for Present {
    fn is_present(&self, dir: &Path) -> bool {
      self.0.contains(dir)
    }
  }

  const HOME: &str = "/tmp/x";

  fn config() -> InstallConfig {
    let mut config = InstallConfig::new(HOME).unwrap();
    config.parallelism = NonZeroUsize::new(8).unwrap();
    config
  }

  fn bash() -> HostEnvironment {
    HostEnvironment::new(Some("/bin/bash"), None)
  }

  fn conda_path() -> Option<PathBuf> {
    Some(PathBuf::from("/opt/conda/bin/conda"))
  }

  fn count(plan: &CommandPlan, needle: &str) -> usize {
    plan.steps().iter().filter(|s| s.contains(needle)).count()
  }

  #[test]
  fn compound_has_no_trailing_separator() {
    let plan: CommandPlan = ["echo a", "echo b"].map(String::from).into_iter().collect();
    assert_eq!(plan.to_compound(), "echo a &&\necho b");
    assert_eq!(CommandPlan::new().to_compound(), "");
  }

  #[test]
  fn conda_environment_creates_then_activates() {
    let config = config();
    let host = bash();
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Conda, &host, conda_path(), &empty);

    let plan = builder.environment(true);
    assert_eq!(
      plan.steps(),
      [
        "eval \"$(/opt/conda/bin/conda shell.bash hook)\"",
        "conda create -n scipion3 python=3.8",
        "conda activate scipion3",
      ]
    );
  }

  #[test]
  fn conda_create_is_silent_without_prompts() {
    let mut config = config();
    config.no_ask = true;
    config.env_name = Some("sci".to_string());
    let host = bash();
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Conda, &host, conda_path(), &empty);

    assert!(builder.environment(true).steps().contains(&"conda create -y -n sci python=3.8".to_string()));
  }

  #[test]
  fn environment_ends_with_single_activation() {
    let config = config();
    let host = bash();
    let empty = Present(HashSet::new());

    for backend in [Backend::Conda, Backend::Venv] {
      let builder = PlanBuilder::new(&config, backend, &host, conda_path(), &empty);
      for create in [true, false] {
        let plan = builder.environment(create);
        let last = plan.steps().last().unwrap();
        let activations = count(&plan, "activate");
        assert_eq!(activations, 1, "{backend} create={create}: {plan:?}");
        assert!(last.contains("activate"));
        let creations = count(&plan, "create -") + count(&plan, "-m venv");
        assert_eq!(creations, usize::from(create), "{backend} create={create}: {plan:?}");
      }
    }
  }

  #[test]
  fn venv_environment_commands() {
    let config = config();
    let host = bash();
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Venv, &host, None, &empty);

    assert_eq!(
      builder.environment(true).steps(),
      [
        "cd /tmp/x",
        "python3 -m venv .scipion3env",
        ". /tmp/x/.scipion3env/bin/activate",
      ]
    );
    assert_eq!(builder.environment(false).steps(), [". /tmp/x/.scipion3env/bin/activate"]);
    assert_eq!(builder.conda_init_line(), None);
  }

  #[test]
  fn activation_line_joins_init_and_activate() {
    let config = config();
    let host = HostEnvironment::new(Some("/bin/bash"), Some(". /site/conda.sh".to_string()));
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Conda, &host, conda_path(), &empty);
    assert_eq!(builder.activation_line(), ". /site/conda.sh && conda activate scipion3");
  }

  #[test]
  fn stable_core_installs_published_packages() {
    let config = config();
    let host = bash();
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Conda, &host, conda_path(), &empty);

    assert_eq!(
      builder.core_install().steps(),
      [
        "cd /tmp/x",
        "mkdir -p software/lib software/bindings software/em",
        "export SCIPION_HOME=/tmp/x",
        "pip install scipion-pyworkflow",
        "pip install scipion-app",
      ]
    );
  }

  #[test]
  fn devel_core_syncs_repositories_in_order() {
    let mut config = config();
    config.devel = true;
    let host = bash();
    let present = Present(HashSet::from([PathBuf::from("/tmp/x/scipion-em")]));
    let builder = PlanBuilder::new(&config, Backend::Venv, &host, None, &present);

    let plan = builder.core_install();
    let steps = &plan.steps()[3..];
    assert_eq!(
      steps,
      [
        "git clone -b devel git@github.com:scipion-em/scipion-pyworkflow.git scipion-pyworkflow",
        "pip install -e scipion-pyworkflow",
        "cd scipion-em",
        "git pull",
        "cd ..",
        "pip install -e scipion-em",
        "git clone -b devel git@github.com:scipion-em/scipion-app.git scipion-app",
        "pip install -e scipion-app",
      ]
    );
  }

  #[test]
  fn shell_quote_leaves_plain_words_alone() {
    assert_eq!(shell_quote("/opt/scipion-3.0/x_y"), "/opt/scipion-3.0/x_y");
    assert_eq!(shell_quote(".scipion3env"), ".scipion3env");
  }

  #[test]
  fn shell_quote_neutralizes_expansion() {
    assert_eq!(shell_quote(""), "''");
    assert_eq!(shell_quote("my env"), "'my env'");
    assert_eq!(shell_quote("/tmp/$HOME/`id`"), "'/tmp/$HOME/`id`'");
    assert_eq!(shell_quote("it's"), "'it'\\''s'");
    assert_eq!(shell_quote("a\nb"), "'a\nb'");
  }

  #[test]
  fn unusual_home_and_env_name_are_quoted() {
    let mut config = InstallConfig::new("/tmp/with space/$x").unwrap();
    config.env_name = Some("sci env".to_string());
    let host = bash();
    let empty = Present(HashSet::new());

    let venv = PlanBuilder::new(&config, Backend::Venv, &host, None, &empty);
    assert_eq!(
      venv.environment(true).steps(),
      [
        "cd '/tmp/with space/$x'",
        "python3 -m venv 'sci env'",
        ". '/tmp/with space/$x/sci env/bin/activate'",
      ]
    );
    assert!(venv.core_install().steps().contains(&"export SCIPION_HOME='/tmp/with space/$x'".to_string()));

    let conda = PlanBuilder::new(&config, Backend::Conda, &host, conda_path(), &empty);
    let steps = conda.environment(true);
    assert_eq!(steps.steps()[1], "conda create -n 'sci env' python=3.8");
    assert_eq!(steps.steps()[2], "conda activate 'sci env'");
  }

  #[test]
  fn optional_modules_skipped_when_disabled() {
    let mut config = config();
    config.modules.xmipp = false;
    let host = bash();
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Venv, &host, None, &empty);
    assert!(builder.optional_modules().is_empty());
  }

  #[test]
  fn stable_optional_module_is_one_plugin_install() {
    let config = config();
    let host = bash();
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Conda, &host, conda_path(), &empty);

    assert_eq!(
      builder.optional_modules().steps(),
      ["SCIPION_HOME=/tmp/x python -m scipion installp -p scipion-em-xmipp -j 8"]
    );
  }

  #[test]
  fn devel_optional_module_bootstraps_bundle() {
    let mut config = config();
    config.devel = true;
    config.transport = crate::config::Transport::Https;
    config.branches.module = "agm_branch".to_string();
    let host = bash();
    let empty = Present(HashSet::new());
    let builder = PlanBuilder::new(&config, Backend::Venv, &host, None, &empty);

    assert_eq!(
      builder.optional_modules().steps(),
      [
        "cd /tmp/x",
        "git clone -b agm_branch https://github.com/I2PC/xmipp.git xmipp-bundle",
        "cd xmipp-bundle",
        "python3 xmipp get_devel_sources agm_branch",
        "python3 xmipp config",
        "pip install -e src/scipion-em-xmipp",
        "python3 xmipp compileAndInstall N=8",
      ]
    );
  }
}
