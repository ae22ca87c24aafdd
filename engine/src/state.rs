//! Owned ledger state and the sync procedures over it.

use crate::accrual::{self, CheckpointBook, SyncPlan, UserCheckpoint};
use crate::error::RewardsError;
use crate::principal::PrincipalLedger;
use crate::registry::{RewardStream, StreamRegistry};
use multirewards_types::{Address, Timestamp};

/// Everything the ledger persists.
#[derive(Clone, Debug)]
pub struct LedgerState {
    pub owner: Address,
    pub staking_token: Address,
    /// Holder of all custodied principal and reward tokens.
    pub custody: Address,
    pub paused: bool,
    pub principal: PrincipalLedger,
    pub registry: StreamRegistry,
    pub checkpoints: CheckpointBook,
}

impl LedgerState {
    pub fn new(owner: Address, staking_token: Address, custody: Address) -> Self {
        Self {
            owner,
            staking_token,
            custody,
            paused: false,
            principal: PrincipalLedger::new(),
            registry: StreamRegistry::new(),
            checkpoints: CheckpointBook::new(),
        }
    }

    fn stream_at(&self, idx: usize) -> Result<&RewardStream, RewardsError> {
        self.registry
            .get(idx)
            .ok_or(RewardsError::UnknownStream(Address::ZERO))
    }

    /// Stream `idx` folded forward to `now`.
    pub fn plan_sync_stream(&self, idx: usize, now: Timestamp) -> Result<RewardStream, RewardsError> {
        accrual::synced_stream(self.stream_at(idx)?, self.principal.total(), now)
    }

    /// Stream `idx` and `account`'s checkpoint in it, both settled at `now`.
    pub fn plan_sync_user(
        &self,
        account: &Address,
        idx: usize,
        now: Timestamp,
    ) -> Result<(RewardStream, UserCheckpoint), RewardsError> {
        let synced = self.plan_sync_stream(idx, now)?;
        let checkpoint = accrual::synced_checkpoint(
            &synced,
            self.principal.balance_of(account),
            &self.checkpoints.get(account, idx),
        )?;
        Ok((synced, checkpoint))
    }

    /// Every stream synced, and `account` settled in each when given.
    pub fn plan_sync_all(
        &self,
        account: Option<&Address>,
        now: Timestamp,
    ) -> Result<SyncPlan, RewardsError> {
        let mut plan = SyncPlan::default();
        for idx in 0..self.registry.len() {
            match account {
                Some(who) => {
                    let (stream, checkpoint) = self.plan_sync_user(who, idx, now)?;
                    plan.streams.push((idx, stream));
                    plan.checkpoints.push((idx, checkpoint));
                }
                None => plan.streams.push((idx, self.plan_sync_stream(idx, now)?)),
            }
        }
        Ok(plan)
    }

    /// Commit a plan produced by one of the `plan_sync_*` methods.
    pub fn apply_sync(&mut self, account: Option<Address>, plan: SyncPlan) {
        for (idx, stream) in plan.streams {
            self.registry.replace(idx, stream);
        }
        if let Some(who) = account {
            for (idx, checkpoint) in plan.checkpoints {
                self.checkpoints.set(who, idx, checkpoint);
            }
        }
    }

    pub fn sync_stream(&mut self, token: &Address, now: Timestamp) -> Result<(), RewardsError> {
        let idx = self.registry.require(token)?;
        let synced = self.plan_sync_stream(idx, now)?;
        self.registry.replace(idx, synced);
        Ok(())
    }

    pub fn sync_user(
        &mut self,
        account: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<(), RewardsError> {
        let idx = self.registry.require(token)?;
        let (stream, checkpoint) = self.plan_sync_user(account, idx, now)?;
        self.registry.replace(idx, stream);
        self.checkpoints.set(*account, idx, checkpoint);
        Ok(())
    }

    /// Sync every stream, settling `account` in each when given.
    pub fn sync_all(&mut self, account: Option<&Address>, now: Timestamp) -> Result<(), RewardsError> {
        let plan = self.plan_sync_all(account, now)?;
        self.apply_sync(account.copied(), plan);
        Ok(())
    }

    /// Unpaid rewards of `account` in stream `idx` as of `now`, without syncing.
    pub fn earned_at(&self, account: &Address, idx: usize, now: Timestamp) -> Result<u128, RewardsError> {
        let stream = self.stream_at(idx)?;
        let rpt = accrual::reward_per_token(stream, self.principal.total(), now)?;
        accrual::earned(
            self.principal.balance_of(account),
            &self.checkpoints.get(account, idx),
            rpt,
        )
    }
}
