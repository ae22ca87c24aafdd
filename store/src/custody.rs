//! Token custody boundary.
//!
//! The ledger never holds token balances itself. Every movement of principal
//! or reward tokens goes through a [`TokenBank`], which is expected to move
//! *exactly* the requested amount. Fee-on-transfer tokens must exempt the
//! ledger's custody address; short transfers are not compensated.

use multirewards_types::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single token movement between two holders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: u128,
}

impl Transfer {
    pub fn new(token: Address, from: Address, to: Address, amount: u128) -> Self {
        Self {
            token,
            from,
            to,
            amount,
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("insufficient {token} balance for {holder}: need {needed}, have {available}")]
    InsufficientFunds {
        token: Address,
        holder: Address,
        needed: u128,
        available: u128,
    },

    #[error("token balance overflow for {holder}")]
    Overflow { holder: Address },

    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Custody of fungible tokens, addressed by token identity.
pub trait TokenBank {
    /// Current balance of `holder` in `token`.
    fn balance_of(&self, token: &Address, holder: &Address) -> Result<u128, TokenError>;

    /// Execute a batch of transfers atomically: either every transfer in the
    /// batch is applied, or none is and an error is returned.
    fn execute(&mut self, transfers: &[Transfer]) -> Result<(), TokenError>;
}
