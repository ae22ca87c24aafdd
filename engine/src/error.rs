//! Ledger errors.

use multirewards_store::{StoreError, TokenError};
use multirewards_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewardsError {
    #[error("{caller} is not authorized for this operation")]
    Unauthorized { caller: Address },

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("insufficient staked balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u128, available: u128 },

    #[error("reward stream {0} is already registered")]
    AlreadyRegistered(Address),

    #[error("reward duration must be non-zero")]
    InvalidDuration,

    #[error("funding {token} is insolvent: promised {promised}, held {held}")]
    InsolventFunding {
        token: Address,
        promised: u128,
        held: u128,
    },

    #[error("{0} is a protected asset and cannot be recovered")]
    ProtectedAsset(Address),

    #[error("arithmetic overflow in reward computation")]
    Overflow,

    #[error("reward stream {0} is not registered")]
    UnknownStream(Address),

    #[error("reward period for {0} has not finished")]
    PeriodActive(Address),

    #[error("staking is paused")]
    Paused,

    #[error("token transfer failed: {0}")]
    Token(#[from] TokenError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
