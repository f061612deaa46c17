//! Console key bindings for the scan controls

use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::analysis::ScanMode;
use crate::shared::HuntCommand;

/// Longest accepted `hold <secs>` duration
const MAX_HOLD_SECS: f64 = 600.0;

/// Help text listing every binding
pub const HELP: &str = "\
Commands:
  q, question      switch to question mode
  a, answer        switch to answer mode
  press, hold      start scanning repeatedly
  release          stop scanning
  hold <secs>      scan repeatedly for <secs> seconds
  s, scan          scan once
  reset            clear the round, keep captured answers
  hard-reset       clear the round and every captured answer
  status           show the current state
  help, ?          show this help
  quit, exit       leave";

/// Parses a console line like "q", "hold 3" or "hard-reset" into a command
pub fn parse_command(line: &str) -> Result<HuntCommand> {
    let mut parts = line.split_whitespace();
    let word = parts
        .next()
        .ok_or_else(|| anyhow!("Empty command"))?
        .to_lowercase();
    let argument = parts.next();

    if parts.next().is_some() {
        return Err(anyhow!("Too many arguments in {:?}", line.trim()));
    }

    let command = match (word.as_str(), argument) {
        ("q" | "question", None) => HuntCommand::SetMode(ScanMode::Seeking),
        ("a" | "answer", None) => HuntCommand::SetMode(ScanMode::Matching),
        ("press" | "hold", None) => HuntCommand::Press,
        ("hold", Some(secs)) => HuntCommand::HoldFor(parse_hold_duration(secs)?),
        ("release", None) => HuntCommand::Release,
        ("s" | "scan", None) => HuntCommand::ScanOnce,
        ("reset", None) => HuntCommand::Reset { hard: false },
        ("hard-reset" | "hardreset", None) => HuntCommand::Reset { hard: true },
        ("status", None) => HuntCommand::Status,
        ("help" | "?", None) => HuntCommand::Help,
        ("quit" | "exit", None) => HuntCommand::Quit,
        (_, Some(arg)) => return Err(anyhow!("Unexpected argument {:?} for {:?}", arg, word)),
        (other, None) => return Err(anyhow!("Unknown command: {}", other)),
    };

    Ok(command)
}

/// Parse the seconds argument of `hold <secs>`
fn parse_hold_duration(secs: &str) -> Result<Duration> {
    let value: f64 = secs
        .parse()
        .map_err(|_| anyhow!("Invalid hold duration: {}", secs))?;
    if !value.is_finite() || value <= 0.0 || value > MAX_HOLD_SECS {
        return Err(anyhow!(
            "Hold duration must be between 0 and {} seconds",
            MAX_HOLD_SECS
        ));
    }
    Ok(Duration::from_secs_f64(value))
}

/// Whether a confirmation answer accepts the destructive action
pub fn is_confirmation(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
