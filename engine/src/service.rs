//! Thread-safe front end for a ledger and its token bank.
//!
//! Every operation runs inside one critical section, so concurrent callers
//! observe operations as if they ran one after another.

use crate::controller::{ExitOutcome, MultiRewards, Payout};
use crate::error::RewardsError;
use multirewards_store::{LedgerStore, TokenBank};
use multirewards_types::{Address, Timestamp};
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Inner<B> {
    ledger: MultiRewards,
    bank: B,
}

pub struct LedgerService<B: TokenBank> {
    inner: Mutex<Inner<B>>,
}

impl<B: TokenBank> LedgerService<B> {
    pub fn new(ledger: MultiRewards, bank: B) -> Self {
        Self {
            inner: Mutex::new(Inner { ledger, bank }),
        }
    }

    // Operations commit only after every fallible step; a poisoned lock
    // still guards a consistent ledger.
    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stake(&self, account: &Address, amount: u128, now: Timestamp) -> Result<(), RewardsError> {
        let mut guard = self.lock();
        let Inner { ledger, bank } = &mut *guard;
        ledger.stake(bank, account, amount, now)
    }

    pub fn withdraw(&self, account: &Address, amount: u128, now: Timestamp) -> Result<(), RewardsError> {
        let mut guard = self.lock();
        let Inner { ledger, bank } = &mut *guard;
        ledger.withdraw(bank, account, amount, now)
    }

    pub fn claim(
        &self,
        account: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<Option<Payout>, RewardsError> {
        let mut guard = self.lock();
        let Inner { ledger, bank } = &mut *guard;
        ledger.claim(bank, account, token, now)
    }

    pub fn claim_all(&self, account: &Address, now: Timestamp) -> Result<Vec<Payout>, RewardsError> {
        let mut guard = self.lock();
        let Inner { ledger, bank } = &mut *guard;
        ledger.claim_all(bank, account, now)
    }

    pub fn exit(&self, account: &Address, now: Timestamp) -> Result<ExitOutcome, RewardsError> {
        let mut guard = self.lock();
        let Inner { ledger, bank } = &mut *guard;
        ledger.exit(bank, account, now)
    }

    pub fn fund_stream(
        &self,
        caller: &Address,
        token: &Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, RewardsError> {
        let mut guard = self.lock();
        let Inner { ledger, bank } = &mut *guard;
        ledger.fund_stream(bank, caller, token, amount, now)
    }

    pub fn recover_foreign_asset(
        &self,
        caller: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<(), RewardsError> {
        let mut guard = self.lock();
        let Inner { ledger, bank } = &mut *guard;
        ledger.recover_foreign_asset(bank, caller, token, amount)
    }

    /// Run `f` with exclusive access to the ledger. Admin operations and
    /// views go through here.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&mut MultiRewards) -> R) -> R {
        f(&mut self.lock().ledger)
    }

    /// Run `f` with read access to the token bank.
    pub fn with_bank<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(&self.lock().bank)
    }

    /// Persist a consistent snapshot of the ledger.
    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), RewardsError> {
        self.lock().ledger.save_to_store(store)
    }

    pub fn into_parts(self) -> (MultiRewards, B) {
        let inner = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (inner.ledger, inner.bank)
    }
}
