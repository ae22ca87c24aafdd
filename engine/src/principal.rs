//! Principal (staked token) accounting.

use crate::error::RewardsError;
use multirewards_types::Address;
use std::collections::HashMap;

/// Per-account staked balances and their running total.
///
/// Accounts are never removed; a fully withdrawn account keeps a zero entry.
/// `total` always equals the sum of all balances.
#[derive(Clone, Debug, Default)]
pub struct PrincipalLedger {
    balances: HashMap<Address, u128>,
    total: u128,
}

/// Post-operation balances computed ahead of committing them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrincipalChange {
    pub account: Address,
    pub balance: u128,
    pub total: u128,
}

impl PrincipalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u128 {
        self.total
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter()
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Balances after depositing `amount` for `account`, without mutating.
    pub fn plan_deposit(&self, account: Address, amount: u128) -> Result<PrincipalChange, RewardsError> {
        if amount == 0 {
            return Err(RewardsError::InvalidAmount);
        }
        let balance = self
            .balance_of(&account)
            .checked_add(amount)
            .ok_or(RewardsError::Overflow)?;
        let total = self.total.checked_add(amount).ok_or(RewardsError::Overflow)?;
        Ok(PrincipalChange {
            account,
            balance,
            total,
        })
    }

    /// Balances after releasing `amount` from `account`, without mutating.
    pub fn plan_release(&self, account: Address, amount: u128) -> Result<PrincipalChange, RewardsError> {
        if amount == 0 {
            return Err(RewardsError::InvalidAmount);
        }
        let available = self.balance_of(&account);
        if amount > available {
            return Err(RewardsError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        let total = self.total.checked_sub(amount).ok_or(RewardsError::Overflow)?;
        Ok(PrincipalChange {
            account,
            balance: available - amount,
            total,
        })
    }

    pub fn apply(&mut self, change: PrincipalChange) {
        self.balances.insert(change.account, change.balance);
        self.total = change.total;
    }

    pub fn deposit(&mut self, account: Address, amount: u128) -> Result<(), RewardsError> {
        let change = self.plan_deposit(account, amount)?;
        self.apply(change);
        Ok(())
    }

    pub fn release(&mut self, account: Address, amount: u128) -> Result<(), RewardsError> {
        let change = self.plan_release(account, amount)?;
        self.apply(change);
        Ok(())
    }

    /// Whether the recorded total equals the sum of balances.
    pub fn is_conserved(&self) -> bool {
        self.balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            == Some(self.total)
    }

    pub(crate) fn from_parts(balances: HashMap<Address, u128>, total: u128) -> Self {
        Self { balances, total }
    }
}
