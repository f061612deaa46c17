//! Match Analysis Layer
//!
//! The mode engine cross-references codes seen in question mode with the
//! crops captured in answer mode and decides what gets revealed.

pub mod engine;
pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use engine::{EngineConfig, ModeEngine};
pub use events::TickReport;

/// Which list the scanner is currently feeding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanMode {
    /// Question mode: the codes in view become the round's sought codes
    #[default]
    #[serde(rename = "question")]
    Seeking,
    /// Answer mode: the codes in view are captured for later matching
    #[serde(rename = "answer")]
    Matching,
}

impl ScanMode {
    pub fn label(&self) -> &'static str {
        match self {
            ScanMode::Seeking => "question",
            ScanMode::Matching => "answer",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScanMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "q" | "question" | "seeking" => Ok(ScanMode::Seeking),
            "a" | "answer" | "matching" => Ok(ScanMode::Matching),
            other => Err(anyhow::anyhow!("Unknown scan mode: {}", other)),
        }
    }
}
