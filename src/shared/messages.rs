//! Message types sent from the console to the scan driver

use std::time::Duration;

use crate::analysis::ScanMode;

/// Commands understood by the interactive console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuntCommand {
    /// Switch between question and answer mode
    SetMode(ScanMode),
    /// Start repeating scans
    Press,
    /// Stop repeating scans
    Release,
    /// Press, wait, release
    HoldFor(Duration),
    /// Run a single scan now
    ScanOnce,
    /// Clear the round; `hard` also drops captured answers
    Reset { hard: bool },
    /// Print the current state
    Status,
    /// Print the command list
    Help,
    /// Leave the console
    Quit,
}

impl HuntCommand {
    /// Commands that destroy data and need a confirmation first
    pub fn needs_confirmation(&self) -> bool {
        matches!(self, HuntCommand::Reset { hard: true })
    }
}
