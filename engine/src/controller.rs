//! The MultiRewards ledger: principal staking plus any number of reward streams.
//!
//! Every mutating operation follows the same shape:
//!
//! 1. validate and compute the synced streams, checkpoints and balances
//!    without touching state,
//! 2. execute the required token transfers as one all-or-nothing batch,
//! 3. commit the staged state and emit events.
//!
//! A failure at any step therefore leaves the ledger exactly as it was.

use crate::accrual::{self, SyncPlan, UserCheckpoint};
use crate::error::RewardsError;
use crate::event::{EventBus, LedgerEvent};
use crate::registry::RewardStream;
use crate::state::LedgerState;
use multirewards_store::{TokenBank, Transfer};
use multirewards_types::{Address, Timestamp, U256};
use tracing::{debug, info, warn};

/// A reward transfer made to an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub token: Address,
    pub amount: u128,
}

/// Result of [`MultiRewards::exit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExitOutcome {
    pub withdrawn: u128,
    pub payouts: Vec<Payout>,
}

pub struct MultiRewards {
    state: LedgerState,
    events: EventBus,
}

impl MultiRewards {
    pub fn new(owner: Address, staking_token: Address, custody: Address) -> Self {
        Self::from_state(LedgerState::new(owner, staking_token, custody))
    }

    pub fn from_state(state: LedgerState) -> Self {
        Self {
            state,
            events: EventBus::new(),
        }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn into_state(self) -> LedgerState {
        self.state
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&LedgerEvent) + Send + Sync>) {
        self.events.subscribe(listener);
    }

    fn emit(&self, event: LedgerEvent) {
        self.events.emit(&event);
    }

    fn only_owner(&self, caller: &Address) -> Result<(), RewardsError> {
        if *caller != self.state.owner {
            warn!(caller = %caller, "rejected owner-only operation");
            return Err(RewardsError::Unauthorized { caller: *caller });
        }
        Ok(())
    }

    /// Zero out every non-zero checkpoint in `plan`, returning the payouts and
    /// their transfers in stream order.
    fn drain_rewards(
        &self,
        account: &Address,
        plan: &mut SyncPlan,
    ) -> Result<(Vec<Payout>, Vec<Transfer>), RewardsError> {
        let mut payouts = Vec::new();
        let mut transfers = Vec::new();
        for (idx, checkpoint) in plan.checkpoints.iter_mut() {
            if checkpoint.accrued_unclaimed == 0 {
                continue;
            }
            let token = self
                .state
                .registry
                .token_at(*idx)
                .ok_or(RewardsError::UnknownStream(Address::ZERO))?;
            let amount = std::mem::take(&mut checkpoint.accrued_unclaimed);
            transfers.push(Transfer::new(token, self.state.custody, *account, amount));
            payouts.push(Payout { token, amount });
        }
        Ok((payouts, transfers))
    }

    fn emit_payouts(&self, account: &Address, payouts: &[Payout]) {
        for payout in payouts {
            info!(account = %account, token = %payout.token, amount = payout.amount, "reward paid");
            self.emit(LedgerEvent::RewardPaid {
                account: *account,
                token: payout.token,
                amount: payout.amount,
            });
        }
    }

    // ── Owner and distributor operations ────────────────────────────────

    /// Add a reward stream. Returns its index.
    pub fn register_stream(
        &mut self,
        caller: &Address,
        token: Address,
        distributor: Address,
        duration: u64,
    ) -> Result<usize, RewardsError> {
        self.only_owner(caller)?;
        let idx = self.state.registry.register(token, distributor, duration)?;
        info!(token = %token, distributor = %distributor, duration, index = idx, "reward stream registered");
        Ok(idx)
    }

    pub fn set_rewards_distributor(
        &mut self,
        caller: &Address,
        token: &Address,
        distributor: Address,
    ) -> Result<(), RewardsError> {
        self.only_owner(caller)?;
        let idx = self.state.registry.require(token)?;
        let mut stream = self.stream(idx)?.clone();
        stream.distributor = distributor;
        self.state.registry.replace(idx, stream);
        info!(token = %token, distributor = %distributor, "distributor updated");
        self.emit(LedgerEvent::RewardsDistributorUpdated {
            token: *token,
            distributor,
        });
        Ok(())
    }

    /// Change a stream's period length. Only allowed once the current period is over.
    pub fn set_rewards_duration(
        &mut self,
        caller: &Address,
        token: &Address,
        duration: u64,
        now: Timestamp,
    ) -> Result<(), RewardsError> {
        let idx = self.state.registry.require(token)?;
        let stream = self.stream(idx)?;
        if *caller != stream.distributor {
            warn!(caller = %caller, token = %token, "rejected duration change");
            return Err(RewardsError::Unauthorized { caller: *caller });
        }
        if now <= stream.period_finish {
            return Err(RewardsError::PeriodActive(*token));
        }
        if duration == 0 {
            return Err(RewardsError::InvalidDuration);
        }
        let mut stream = stream.clone();
        stream.duration = duration;
        self.state.registry.replace(idx, stream);
        info!(token = %token, duration, "rewards duration updated");
        self.emit(LedgerEvent::RewardsDurationUpdated {
            token: *token,
            duration,
        });
        Ok(())
    }

    pub fn set_paused(&mut self, caller: &Address, paused: bool) -> Result<(), RewardsError> {
        self.only_owner(caller)?;
        if self.state.paused == paused {
            return Ok(());
        }
        self.state.paused = paused;
        info!(paused, "pause flag changed");
        self.emit(LedgerEvent::PauseChanged { paused });
        Ok(())
    }

    /// Fund a stream with `amount` of its token pulled from `caller`.
    ///
    /// Any emission still scheduled for the current period is rolled into the
    /// new rate. Returns the new rate.
    pub fn fund_stream(
        &mut self,
        bank: &mut dyn TokenBank,
        caller: &Address,
        token: &Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, RewardsError> {
        let idx = self.state.registry.require(token)?;
        if *caller != self.stream(idx)?.distributor {
            warn!(caller = %caller, token = %token, "rejected funding");
            return Err(RewardsError::Unauthorized { caller: *caller });
        }

        let mut synced = self.state.plan_sync_stream(idx, now)?;
        let duration = u128::from(synced.duration);
        let reward_rate = if now >= synced.period_finish {
            amount / duration
        } else {
            let remaining_secs = synced.period_finish.as_secs() - now.as_secs();
            let leftover = u128::from(remaining_secs)
                .checked_mul(synced.reward_rate)
                .ok_or(RewardsError::Overflow)?;
            amount.checked_add(leftover).ok_or(RewardsError::Overflow)? / duration
        };

        let held = bank
            .balance_of(token, &self.state.custody)?
            .checked_add(amount)
            .ok_or(RewardsError::Overflow)?;
        let promised = reward_rate
            .checked_mul(duration)
            .ok_or(RewardsError::Overflow)?;
        if promised > held {
            return Err(RewardsError::InsolventFunding {
                token: *token,
                promised,
                held,
            });
        }

        synced.reward_rate = reward_rate;
        synced.last_update_time = now;
        synced.period_finish = now
            .checked_add_secs(synced.duration)
            .ok_or(RewardsError::Overflow)?;

        bank.execute(&[Transfer::new(*token, *caller, self.state.custody, amount)])?;
        self.state.registry.replace(idx, synced);

        info!(token = %token, amount, reward_rate, "reward stream funded");
        self.emit(LedgerEvent::RewardAdded {
            token: *token,
            reward_rate,
        });
        Ok(reward_rate)
    }

    /// Sweep a token that is neither the principal nor a registered reward
    /// token out to the owner. No accounting sync takes place.
    pub fn recover_foreign_asset(
        &mut self,
        bank: &mut dyn TokenBank,
        caller: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<(), RewardsError> {
        self.only_owner(caller)?;
        if *token == self.state.staking_token || self.state.registry.contains(token) {
            warn!(token = %token, "refused to recover protected asset");
            return Err(RewardsError::ProtectedAsset(*token));
        }
        bank.execute(&[Transfer::new(
            *token,
            self.state.custody,
            self.state.owner,
            amount,
        )])?;
        info!(token = %token, amount, "foreign asset recovered");
        self.emit(LedgerEvent::Recovered {
            token: *token,
            amount,
        });
        Ok(())
    }

    // ── Participant operations ──────────────────────────────────────────

    pub fn stake(
        &mut self,
        bank: &mut dyn TokenBank,
        account: &Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), RewardsError> {
        if self.state.paused {
            return Err(RewardsError::Paused);
        }
        let change = self.state.principal.plan_deposit(*account, amount)?;
        let plan = self.state.plan_sync_all(Some(account), now)?;

        bank.execute(&[Transfer::new(
            self.state.staking_token,
            *account,
            self.state.custody,
            amount,
        )])?;
        self.state.apply_sync(Some(*account), plan);
        self.state.principal.apply(change);

        info!(account = %account, amount, total = change.total, "staked");
        self.emit(LedgerEvent::Staked {
            account: *account,
            amount,
        });
        Ok(())
    }

    pub fn withdraw(
        &mut self,
        bank: &mut dyn TokenBank,
        account: &Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), RewardsError> {
        let change = self.state.principal.plan_release(*account, amount)?;
        let plan = self.state.plan_sync_all(Some(account), now)?;

        bank.execute(&[Transfer::new(
            self.state.staking_token,
            self.state.custody,
            *account,
            amount,
        )])?;
        self.state.apply_sync(Some(*account), plan);
        self.state.principal.apply(change);

        info!(account = %account, amount, total = change.total, "withdrawn");
        self.emit(LedgerEvent::Withdrawn {
            account: *account,
            amount,
        });
        Ok(())
    }

    /// Pay out `account`'s unclaimed rewards in one stream. Returns `None`
    /// when nothing was owed.
    pub fn claim(
        &mut self,
        bank: &mut dyn TokenBank,
        account: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<Option<Payout>, RewardsError> {
        let idx = self.state.registry.require(token)?;
        let (stream, checkpoint) = self.state.plan_sync_user(account, idx, now)?;
        let mut plan = SyncPlan {
            streams: vec![(idx, stream)],
            checkpoints: vec![(idx, checkpoint)],
        };
        let (payouts, transfers) = self.drain_rewards(account, &mut plan)?;

        if !transfers.is_empty() {
            bank.execute(&transfers)?;
        }
        self.state.apply_sync(Some(*account), plan);
        self.emit_payouts(account, &payouts);
        Ok(payouts.into_iter().next())
    }

    /// Pay out `account`'s unclaimed rewards in every stream.
    pub fn claim_all(
        &mut self,
        bank: &mut dyn TokenBank,
        account: &Address,
        now: Timestamp,
    ) -> Result<Vec<Payout>, RewardsError> {
        let mut plan = self.state.plan_sync_all(Some(account), now)?;
        let (payouts, transfers) = self.drain_rewards(account, &mut plan)?;

        if !transfers.is_empty() {
            bank.execute(&transfers)?;
        }
        self.state.apply_sync(Some(*account), plan);
        self.emit_payouts(account, &payouts);
        Ok(payouts)
    }

    /// Withdraw the full staked balance and claim every stream.
    pub fn exit(
        &mut self,
        bank: &mut dyn TokenBank,
        account: &Address,
        now: Timestamp,
    ) -> Result<ExitOutcome, RewardsError> {
        let withdrawn = self.state.principal.balance_of(account);
        let change = self.state.principal.plan_release(*account, withdrawn)?;
        let mut plan = self.state.plan_sync_all(Some(account), now)?;
        let (payouts, reward_transfers) = self.drain_rewards(account, &mut plan)?;

        let mut transfers = Vec::with_capacity(reward_transfers.len() + 1);
        transfers.push(Transfer::new(
            self.state.staking_token,
            self.state.custody,
            *account,
            withdrawn,
        ));
        transfers.extend(reward_transfers);
        bank.execute(&transfers)?;

        self.state.apply_sync(Some(*account), plan);
        self.state.principal.apply(change);

        info!(account = %account, amount = withdrawn, total = change.total, "withdrawn");
        self.emit(LedgerEvent::Withdrawn {
            account: *account,
            amount: withdrawn,
        });
        self.emit_payouts(account, &payouts);
        Ok(ExitOutcome { withdrawn, payouts })
    }

    // ── Accounting sync ─────────────────────────────────────────────────

    pub fn sync_stream(&mut self, token: &Address, now: Timestamp) -> Result<(), RewardsError> {
        self.state.sync_stream(token, now)?;
        debug!(token = %token, now = now.as_secs(), "stream synced");
        Ok(())
    }

    pub fn sync_user(
        &mut self,
        account: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<(), RewardsError> {
        self.state.sync_user(account, token, now)?;
        debug!(account = %account, token = %token, now = now.as_secs(), "account synced");
        Ok(())
    }

    /// Sync every stream, settling `account` in each when given.
    pub fn sync_all(&mut self, account: Option<&Address>, now: Timestamp) -> Result<(), RewardsError> {
        self.state.sync_all(account, now)?;
        debug!(streams = self.state.registry.len(), now = now.as_secs(), "all streams synced");
        Ok(())
    }

    // ── Views ───────────────────────────────────────────────────────────

    fn stream(&self, idx: usize) -> Result<&RewardStream, RewardsError> {
        self.state
            .registry
            .get(idx)
            .ok_or(RewardsError::UnknownStream(Address::ZERO))
    }

    pub fn owner(&self) -> Address {
        self.state.owner
    }

    pub fn staking_token(&self) -> Address {
        self.state.staking_token
    }

    pub fn custody(&self) -> Address {
        self.state.custody
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn total_supply(&self) -> u128 {
        self.state.principal.total()
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.state.principal.balance_of(account)
    }

    pub fn reward_token_length(&self) -> usize {
        self.state.registry.len()
    }

    pub fn reward_tokens(&self, index: usize) -> Option<Address> {
        self.state.registry.token_at(index)
    }

    pub fn reward_data(&self, token: &Address) -> Result<&RewardStream, RewardsError> {
        self.state
            .registry
            .by_token(token)
            .ok_or(RewardsError::UnknownStream(*token))
    }

    pub fn last_time_reward_applicable(
        &self,
        token: &Address,
        now: Timestamp,
    ) -> Result<Timestamp, RewardsError> {
        Ok(accrual::last_applicable_time(self.reward_data(token)?, now))
    }

    pub fn reward_per_token(&self, token: &Address, now: Timestamp) -> Result<U256, RewardsError> {
        accrual::reward_per_token(self.reward_data(token)?, self.total_supply(), now)
    }

    pub fn earned(
        &self,
        account: &Address,
        token: &Address,
        now: Timestamp,
    ) -> Result<u128, RewardsError> {
        let idx = self.state.registry.require(token)?;
        self.state.earned_at(account, idx, now)
    }

    pub fn reward_for_duration(&self, token: &Address) -> Result<u128, RewardsError> {
        accrual::reward_for_duration(self.reward_data(token)?)
    }

    fn checkpoint(&self, account: &Address, token: &Address) -> Result<UserCheckpoint, RewardsError> {
        let idx = self.state.registry.require(token)?;
        Ok(self.state.checkpoints.get(account, idx))
    }

    pub fn user_reward_per_token_paid(
        &self,
        account: &Address,
        token: &Address,
    ) -> Result<U256, RewardsError> {
        Ok(self.checkpoint(account, token)?.reward_per_token_paid)
    }

    /// Rewards settled into `account`'s checkpoint but not yet paid.
    pub fn rewards(&self, account: &Address, token: &Address) -> Result<u128, RewardsError> {
        Ok(self.checkpoint(account, token)?.accrued_unclaimed)
    }
}
