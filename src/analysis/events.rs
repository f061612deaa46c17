//! Outcomes of engine operations

use super::ScanMode;

/// What a single tick changed
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Mode the tick was applied in
    pub mode: ScanMode,
    /// Codes detected in the frame, in detection order
    pub detected: Vec<String>,
    /// Codes written to the cache (matching ticks only)
    pub cached: Vec<String>,
    /// Codes revealed as matches by this tick
    pub revealed: Vec<String>,
}

impl TickReport {
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            detected: Vec::new(),
            cached: Vec::new(),
            revealed: Vec::new(),
        }
    }

    /// Whether anything became visible as a match
    pub fn has_reveals(&self) -> bool {
        !self.revealed.is_empty()
    }
}
