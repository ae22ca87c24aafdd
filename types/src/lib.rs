//! Fundamental types for the MultiRewards ledger.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! token/account addresses, timestamps, and the 256-bit fixed-point arithmetic used
//! by the reward accumulators.

pub mod address;
pub mod error;
pub mod fixed;
pub mod time;

pub use address::Address;
pub use error::TypesError;
pub use fixed::{U256, SCALE};
pub use time::Timestamp;
