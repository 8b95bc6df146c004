//! Fixed names shared by the plan builders, the launcher and the CLI.

/// Separator joining plan steps into one compound command.
pub const CMD_SEP: &str = " &&\n";

pub const CONDA: &str = "conda";
pub const PYTHON3: &str = "python3";
pub const GIT: &str = "git";
pub const PIP: &str = "pip";

/// Interpreter pin passed to `conda create`.
pub const CONDA_PYTHON: &str = "python=3.8";

pub const CONDA_ENV_NAME: &str = "scipion3";
pub const VENV_NAME: &str = ".scipion3env";

pub const DEVEL_BRANCH: &str = "devel";
pub const GIT_HOST: &str = "github.com";

/// Variable exported by the install plan and read by the launcher.
pub const HOME_VAR: &str = "SCIPION_HOME";

/// Storage directories created under the installation root.
pub const SCAFFOLD_DIRS: [&str; 3] = ["software/lib", "software/bindings", "software/em"];

pub const LAUNCHER_NAME: &str = "scipion3";
pub const CONFIG_DIR: &str = "config";
pub const CONFIG_NAME: &str = "scipion.conf";
pub const CONFIG_SECTION: &str = "PYWORKFLOW";
pub const SCRATCH_KEY: &str = "SCIPION_SCRATCH";

/// Environment variable (and config key) holding an explicit conda init line.
pub const ACTIVATION_OVERRIDE_VAR: &str = "CONDA_ACTIVATION_CMD";
pub const SHELL_VAR: &str = "SHELL";
pub const DEFAULT_SHELL: &str = "bash";

pub const TROUBLESHOOTING_URL: &str = "https://scipion-em.github.io/docs/docs/scipion-modes/troubleshooting";
