//! End-to-end installs against fake host programs.

#![cfg(unix)]

mod common;
mod install_tests;
