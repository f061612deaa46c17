//! Runtime state shared between the scan loop and the console

use crate::analysis::ScanMode;

/// Central shared state between the console and the scan loop
#[derive(Debug, Clone, Default)]
pub struct SharedHuntState {
    /// Mode new ticks are applied in
    pub mode: ScanMode,
    /// Runtime state (not persisted)
    pub runtime: RuntimeState,
}

impl SharedHuntState {
    /// Create a new shared state starting in the given mode
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            runtime: RuntimeState::default(),
        }
    }
}

/// Runtime state that is not persisted
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Whether the scan button is held
    pub is_holding: bool,
    /// Ticks that ran to completion
    pub ticks_completed: u64,
    /// Ticks dropped because another was in flight
    pub ticks_dropped: u64,
    /// Codes seen by the most recent completed tick
    pub last_detected: Vec<String>,
    /// Last error message (if any)
    pub last_error: Option<String>,
}

impl RuntimeState {
    /// Clear any error state
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Set an error message
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_state() {
        let mut runtime = RuntimeState::default();
        runtime.set_error("camera unavailable");
        assert_eq!(runtime.last_error.as_deref(), Some("camera unavailable"));
        runtime.clear_error();
        assert!(runtime.last_error.is_none());
    }

    #[test]
    fn test_new_state_starts_idle() {
        let state = SharedHuntState::new(ScanMode::Matching);
        assert_eq!(state.mode, ScanMode::Matching);
        assert!(!state.runtime.is_holding);
        assert_eq!(state.runtime.ticks_completed, 0);
    }
}
