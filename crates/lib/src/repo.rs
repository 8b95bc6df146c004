//! Source repositories fetched in devel mode and how each one is synced.
//!
//! A repository folder that already exists under the installation root is
//! always updated in place, never removed or re-cloned. The folder is not
//! inspected: a checkout of a different branch looks the same as a fresh one,
//! so re-running with another branch name does not switch branches.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::config::{Branches, InstallConfig, Transport};
use crate::consts::{GIT, GIT_HOST, PIP};

/// Which configured branch a repository follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchGroup {
  Core,
  Module,
}

/// Static description of one fetchable repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepositorySpec {
  pub name: &'static str,
  pub organization: &'static str,
  /// Checkout folder under the installation root.
  pub folder: &'static str,
  pub branch: BranchGroup,
  /// Follow the sync with `pip install -e <folder>`.
  pub pip_install: bool,
  /// Core components are always installed; others depend on module flags.
  pub required: bool,
}

/// Core components in dependency order: each one imports the previous.
pub const CORE_REPOSITORIES: [RepositorySpec; 3] = [
  RepositorySpec {
    name: "scipion-pyworkflow",
    organization: "scipion-em",
    folder: "scipion-pyworkflow",
    branch: BranchGroup::Core,
    pip_install: true,
    required: true,
  },
  RepositorySpec {
    name: "scipion-em",
    organization: "scipion-em",
    folder: "scipion-em",
    branch: BranchGroup::Core,
    pip_install: true,
    required: true,
  },
  RepositorySpec {
    name: "scipion-app",
    organization: "scipion-em",
    folder: "scipion-app",
    branch: BranchGroup::Core,
    pip_install: true,
    required: true,
  },
];

/// The xmipp bundle. It bootstraps its own sources, so no pip step follows the clone.
pub const XMIPP_BUNDLE: RepositorySpec = RepositorySpec {
  name: "xmipp",
  organization: "I2PC",
  folder: "xmipp-bundle",
  branch: BranchGroup::Module,
  pip_install: false,
  required: false,
};

impl RepositorySpec {
  pub fn url(&self, transport: Transport) -> String {
    match transport {
      Transport::Ssh => format!("git@{}:{}/{}.git", GIT_HOST, self.organization, self.name),
      Transport::Https => format!("https://{}/{}/{}.git", GIT_HOST, self.organization, self.name),
    }
  }

  pub fn branch<'a>(&self, branches: &'a Branches) -> &'a str {
    match self.branch {
      BranchGroup::Core => &branches.core,
      BranchGroup::Module => &branches.module,
    }
  }
}

/// Reports whether a checkout folder is already present.
pub trait Checkouts {
  fn is_present(&self, dir: &Path) -> bool;
}

/// Checks the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCheckouts;

impl Checkouts for FsCheckouts {
  fn is_present(&self, dir: &Path) -> bool {
    dir.exists()
  }
}

/// Commands that bring `spec` up to date under the installation root.
///
/// The commands expect to run with the installation root as the working
/// directory.
pub fn sync(spec: &RepositorySpec, config: &InstallConfig, checkouts: &dyn Checkouts) -> Vec<String> {
  let mut steps = Vec::new();
  let dir = config.home().join(spec.folder);

  if checkouts.is_present(&dir) {
    debug!(repo = spec.name, dir = %dir.display(), "checkout present, updating in place");
    steps.push(format!("cd {}", spec.folder));
    steps.push(format!("{} pull", GIT));
    steps.push("cd ..".to_string());
  } else {
    let branch = spec.branch(&config.branches);
    debug!(repo = spec.name, branch, "cloning");
    steps.push(format!(
      "{} clone -b {} {} {}",
      GIT,
      branch,
      spec.url(config.transport),
      spec.folder
    ));
  }

  if spec.pip_install {
    steps.push(format!("{} install -e {}", PIP, spec.folder));
  }

  steps
}
