//! Reward accrual.
//!
//! Every stream carries a global accumulator, reward per unit of principal
//! scaled by 10^18:
//!
//! `rpt(now) = stored + (min(now, period_finish) - last_update) * rate * 10^18 / total`
//!
//! and each account keeps a checkpoint of the accumulator it was last settled
//! at, so that
//!
//! `earned = balance * (rpt - paid) / 10^18 + accrued_unclaimed`.
//!
//! Functions here are pure: they compute synced copies of streams and
//! checkpoints, which callers commit once every fallible step has succeeded.
//! Intermediate products are 256-bit; any result that does not fit its
//! storage width is an `Overflow`.

use crate::error::RewardsError;
use crate::registry::RewardStream;
use multirewards_types::fixed::{scale, serde_u256, to_u128};
use multirewards_types::{Address, Timestamp, U256};
use serde::{Deserialize, Serialize};
use std::cmp;
use std::collections::HashMap;

/// Settlement state of one account in one stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCheckpoint {
    #[serde(with = "serde_u256")]
    pub reward_per_token_paid: U256,
    /// Rewards earned but not yet paid out.
    pub accrued_unclaimed: u128,
}

/// Latest instant at which the stream still distributes.
pub fn last_applicable_time(stream: &RewardStream, now: Timestamp) -> Timestamp {
    cmp::min(now, stream.period_finish)
}

/// Current accumulator value for `stream` given the total staked principal.
///
/// With nothing staked the accumulator does not advance. A `now` earlier than
/// the last update is an `Overflow` whether or not anything is staked.
pub fn reward_per_token(
    stream: &RewardStream,
    total_principal: u128,
    now: Timestamp,
) -> Result<U256, RewardsError> {
    let elapsed = last_applicable_time(stream, now)
        .as_secs()
        .checked_sub(stream.last_update_time.as_secs())
        .ok_or(RewardsError::Overflow)?;
    if total_principal == 0 {
        return Ok(stream.reward_per_token_stored);
    }
    let delta = U256::from(elapsed)
        .checked_mul(U256::from(stream.reward_rate))
        .and_then(|v| v.checked_mul(scale()))
        .and_then(|v| v.checked_div(U256::from(total_principal)))
        .ok_or(RewardsError::Overflow)?;
    stream
        .reward_per_token_stored
        .checked_add(delta)
        .ok_or(RewardsError::Overflow)
}

/// Rewards owed to an account with `balance` staked, at accumulator `rpt`.
pub fn earned(
    balance: u128,
    checkpoint: &UserCheckpoint,
    rpt: U256,
) -> Result<u128, RewardsError> {
    let delta = rpt
        .checked_sub(checkpoint.reward_per_token_paid)
        .ok_or(RewardsError::Overflow)?;
    let fresh = U256::from(balance)
        .checked_mul(delta)
        .ok_or(RewardsError::Overflow)?
        / scale();
    to_u128(fresh)
        .and_then(|v| v.checked_add(checkpoint.accrued_unclaimed))
        .ok_or(RewardsError::Overflow)
}

/// A copy of `stream` with its accumulator folded forward to `now`.
pub fn synced_stream(
    stream: &RewardStream,
    total_principal: u128,
    now: Timestamp,
) -> Result<RewardStream, RewardsError> {
    let mut synced = stream.clone();
    synced.reward_per_token_stored = reward_per_token(stream, total_principal, now)?;
    synced.last_update_time = last_applicable_time(stream, now);
    Ok(synced)
}

/// An account's checkpoint settled against an already-synced stream.
pub fn synced_checkpoint(
    synced: &RewardStream,
    balance: u128,
    checkpoint: &UserCheckpoint,
) -> Result<UserCheckpoint, RewardsError> {
    Ok(UserCheckpoint {
        reward_per_token_paid: synced.reward_per_token_stored,
        accrued_unclaimed: earned(balance, checkpoint, synced.reward_per_token_stored)?,
    })
}

/// Total scheduled emission for one full period at the current rate.
pub fn reward_for_duration(stream: &RewardStream) -> Result<u128, RewardsError> {
    stream
        .reward_rate
        .checked_mul(u128::from(stream.duration))
        .ok_or(RewardsError::Overflow)
}

/// Checkpoints for every account, one slot per stream index.
///
/// Slots past the end of an account's vector are implicitly default.
#[derive(Clone, Debug, Default)]
pub struct CheckpointBook {
    entries: HashMap<Address, Vec<UserCheckpoint>>,
}

impl CheckpointBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &Address, idx: usize) -> UserCheckpoint {
        self.entries
            .get(account)
            .and_then(|slots| slots.get(idx))
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&mut self, account: Address, idx: usize, checkpoint: UserCheckpoint) {
        let slots = self.entries.entry(account).or_default();
        if slots.len() <= idx {
            slots.resize(idx + 1, UserCheckpoint::default());
        }
        slots[idx] = checkpoint;
    }

    pub fn slots(&self, account: &Address) -> &[UserCheckpoint] {
        self.entries.get(account).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Address> {
        self.entries.keys()
    }

    pub(crate) fn insert_slots(&mut self, account: Address, slots: Vec<UserCheckpoint>) {
        self.entries.insert(account, slots);
    }
}

/// Staged stream and checkpoint updates, committed together.
#[derive(Clone, Debug, Default)]
pub struct SyncPlan {
    pub streams: Vec<(usize, RewardStream)>,
    pub checkpoints: Vec<(usize, UserCheckpoint)>,
}
