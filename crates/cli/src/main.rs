mod cmd;
mod output;
mod prompts;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmd::{InstallArgs, cmd_install};
use output::{OutputFormat, print_error, print_warning};

/// Installs Scipion into a fresh conda or venv environment
#[derive(Parser)]
#[command(name = "installscipion")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Happy Scipioning!")]
struct Cli {
  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,

  /// Output format for dry runs
  #[arg(long, value_enum, requires = "dry_run")]
  format: Option<OutputFormat>,

  #[command(flatten)]
  install: InstallArgs,
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "error" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

/// First interrupt is recorded: the running phase is reported as cancelled
/// and nothing further starts. A second one aborts immediately.
fn install_interrupt_handler() -> Result<Arc<AtomicBool>> {
  let interrupted = Arc::new(AtomicBool::new(false));
  let flag = Arc::clone(&interrupted);

  ctrlc::set_handler(move || {
    if flag.swap(true, Ordering::SeqCst) {
      std::process::exit(-1);
    }
    print_warning("Interrupt received, stopping before the next step. Press Ctrl-C again to abort now.");
  })
  .context("Failed to install interrupt handler")?;

  Ok(interrupted)
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let interrupted = install_interrupt_handler()?;
  let format = cli.format.unwrap_or_default();

  match cmd_install(&cli.install, format, interrupted) {
    Ok(true) => Ok(()),
    Ok(false) => std::process::exit(-1),
    Err(e) => {
      print_error(&format!("{:#}", e));
      std::process::exit(-1);
    }
  }
}
