//! MultiRewards: a staking ledger paying out several reward tokens at once.
//!
//! Participants stake one principal token; any number of reward streams each
//! emit their own token at a constant rate over a funding period, split
//! pro-rata to staked principal over time.
//!
//! This crate handles:
//! - Principal accounting (stake, withdraw, exit)
//! - The reward stream registry and its funding schedule
//! - Lazy per-account accrual via a global accumulator and checkpoints
//! - Payouts, asset recovery, events, configuration and persistence

pub mod accrual;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod persist;
pub mod principal;
pub mod registry;
pub mod service;
pub mod state;

pub use accrual::UserCheckpoint;
pub use config::{LedgerConfig, StreamConfig};
pub use controller::{ExitOutcome, MultiRewards, Payout};
pub use error::RewardsError;
pub use event::{EventBus, LedgerEvent};
pub use principal::PrincipalLedger;
pub use registry::{RewardStream, StreamPhase, StreamRegistry};
pub use service::LedgerService;
pub use state::LedgerState;
