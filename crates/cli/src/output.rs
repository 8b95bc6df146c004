//! Everything the installer shows on the terminal.
//!
//! Progress and results go to stdout, warnings and the failure panel to
//! stderr. Colors are only applied when the target stream supports them.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{AnsiColors, OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// Kind of one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
  Step,
  Success,
  Info,
  Warning,
  Error,
}

impl Level {
  fn symbol(self) -> &'static str {
    match self {
      Level::Step => "→",
      Level::Success => "✓",
      Level::Info => "•",
      Level::Warning => "⚠",
      Level::Error => "✗",
    }
  }

  fn color(self) -> AnsiColors {
    match self {
      Level::Step => AnsiColors::Cyan,
      Level::Success => AnsiColors::Green,
      Level::Info => AnsiColors::Blue,
      Level::Warning => AnsiColors::Yellow,
      Level::Error => AnsiColors::Red,
    }
  }

  fn to_stderr(self) -> bool {
    matches!(self, Level::Warning | Level::Error)
  }
}

fn status(level: Level, message: &str) {
  let stream = if level.to_stderr() { Stream::Stderr } else { Stream::Stdout };
  let symbol_text = level.symbol();
  let symbol = symbol_text.if_supports_color(stream, |s| s.color(level.color()));
  match level {
    Level::Warning | Level::Error => {
      eprintln!("{} {}", symbol, message.if_supports_color(stream, |s| s.color(level.color())))
    }
    Level::Step => println!("{} {}", symbol, message.if_supports_color(stream, |s| s.bold())),
    Level::Success | Level::Info => println!("{} {}", symbol, message),
  }
}

const BANNER: &str = r"
   ____       _       _
  / ___|  ___(_)_ __ (_) ___  _ __
  \___ \ / __| | '_ \| |/ _ \| '_ \
   ___) | (__| | |_) | | (_) | | | |
  |____/ \___|_| .__/|_|\___/|_| |_|
               |_|
";

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// Lay out `header` and `lines` inside an ASCII border.
pub fn panel<'a>(header: &str, lines: impl IntoIterator<Item = &'a str>) -> String {
  let lines: Vec<&str> = lines.into_iter().collect();
  let width = lines
    .iter()
    .map(|l| l.chars().count())
    .chain(std::iter::once(header.chars().count()))
    .max()
    .unwrap_or(0);

  let rule = format!("+{}+", "-".repeat(width + 2));
  let row = |text: &str| format!("| {}{} |", text, " ".repeat(width - text.chars().count()));

  let mut out = vec![rule.clone(), row(header), rule.clone()];
  out.extend(lines.iter().map(|l| row(l)));
  out.push(rule);
  out.join("\n")
}

pub fn print_panel<'a>(header: &str, lines: impl IntoIterator<Item = &'a str>) {
  let text = panel(header, lines);
  eprintln!("{}", text.if_supports_color(Stream::Stderr, |s| s.red()));
}

pub fn print_banner() {
  println!("{}", BANNER.if_supports_color(Stream::Stdout, |s| s.cyan()));
}

/// Header shown before each phase.
pub fn print_step(message: &str) {
  status(Level::Step, message);
}

pub fn print_success(message: &str) {
  status(Level::Success, message);
}

pub fn print_error(message: &str) {
  status(Level::Error, message);
}

pub fn print_warning(message: &str) {
  status(Level::Warning, message);
}

pub fn print_info(message: &str) {
  status(Level::Info, message);
}

/// Indented `label: value` line of the success summary.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

/// Pretty-printed JSON followed by a newline.
pub fn write_json<T: serde::Serialize>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
  serde_json::to_writer_pretty(&mut *out, value).context("Failed to serialize plans to JSON")?;
  writeln!(out)?;
  Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  write_json(&mut io::stdout().lock(), value)
}
