//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the ledger (time, storage, token custody)
//! is abstracted behind a trait or an injected value. This crate provides
//! test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or a real token system
//!
//! Usage: swap real implementations for nullables in tests and simulations.

pub mod clock;
pub mod store;
pub mod token;

pub use clock::NullClock;
pub use store::NullStore;
pub use token::NullTokenBank;
