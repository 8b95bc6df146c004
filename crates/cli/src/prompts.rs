use anyhow::{Result, bail};
use std::io::{self, IsTerminal, Write};

pub fn confirm(message: &str) -> Result<bool> {
  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --no-ask to proceed.");
  }

  write!(io::stderr(), "{} [y/N] ", message)?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
  matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
