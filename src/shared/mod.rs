//! Shared state and messaging between the console and the scan loop
//!
//! This module provides the runtime state read by the console and the
//! commands it sends to the scan driver.

pub mod state;
pub mod messages;

pub use state::SharedHuntState;
pub use messages::HuntCommand;
