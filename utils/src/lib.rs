//! Shared utilities for the MultiRewards workspace.

pub mod display;
pub mod logging;

pub use display::{format_amount, format_duration, format_remaining};
pub use logging::{init_logging, LogFormat};
