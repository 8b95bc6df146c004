//! scinstall-lib: plan construction and execution for the Scipion installer
//!
//! An installation is a short sequence of shell command plans:
//! - `backend`: choose between a conda environment and a venv
//! - `plan`: build the environment, core-install and optional-module plans
//! - `repo`: clone-or-update policy for devel-mode source checkouts
//! - `execute`: run a plan as one AND-joined shell invocation
//! - `install`: sequence the phases and classify how a run ended

pub mod backend;
pub mod config;
pub mod consts;
pub mod execute;
pub mod host;
pub mod install;
pub mod launcher;
pub mod plan;
pub mod repo;
pub mod template;

pub use backend::Backend;
pub use config::InstallConfig;
pub use install::{InstallError, InstallOutcome, Installer, Reporter};
