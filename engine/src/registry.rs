//! Reward stream registry.
//!
//! Streams live in an append-only arena indexed by registration order, with a
//! token -> index map for lookup. Per-account checkpoints are keyed by the same
//! index, so a stream's index never changes once assigned.

use crate::error::RewardsError;
use multirewards_types::fixed::serde_u256;
use multirewards_types::{Address, Timestamp, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Distribution schedule and global accumulator for one reward token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStream {
    pub token: Address,
    /// The only identity allowed to fund this stream or change its duration.
    pub distributor: Address,
    /// Length of a funding period in seconds. Non-zero once registered.
    pub duration: u64,
    pub period_finish: Timestamp,
    /// Raw reward units released per second.
    pub reward_rate: u128,
    pub last_update_time: Timestamp,
    /// Cumulative reward per unit of principal, scaled by 10^18.
    #[serde(with = "serde_u256")]
    pub reward_per_token_stored: U256,
}

/// Lifecycle of a registered stream relative to a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamPhase {
    /// Registered but never funded.
    Registered,
    /// Funded and `now < period_finish`.
    Active,
    /// Past its period finish. Funding again reactivates it.
    Expired,
}

impl RewardStream {
    pub fn new(token: Address, distributor: Address, duration: u64) -> Self {
        Self {
            token,
            distributor,
            duration,
            period_finish: Timestamp::EPOCH,
            reward_rate: 0,
            last_update_time: Timestamp::EPOCH,
            reward_per_token_stored: U256::zero(),
        }
    }

    pub fn phase(&self, now: Timestamp) -> StreamPhase {
        if self.period_finish == Timestamp::EPOCH && self.last_update_time == Timestamp::EPOCH {
            StreamPhase::Registered
        } else if now < self.period_finish {
            StreamPhase::Active
        } else {
            StreamPhase::Expired
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StreamRegistry {
    streams: Vec<RewardStream>,
    index: HashMap<Address, usize>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from streams in index order.
    pub fn from_streams(streams: Vec<RewardStream>) -> Result<Self, RewardsError> {
        let mut registry = Self::new();
        for stream in streams {
            if registry.index.contains_key(&stream.token) {
                return Err(RewardsError::AlreadyRegistered(stream.token));
            }
            if stream.duration == 0 {
                return Err(RewardsError::InvalidDuration);
            }
            registry.index.insert(stream.token, registry.streams.len());
            registry.streams.push(stream);
        }
        Ok(registry)
    }

    /// Append a new stream and return its index.
    pub fn register(
        &mut self,
        token: Address,
        distributor: Address,
        duration: u64,
    ) -> Result<usize, RewardsError> {
        if self.index.contains_key(&token) {
            return Err(RewardsError::AlreadyRegistered(token));
        }
        if duration == 0 {
            return Err(RewardsError::InvalidDuration);
        }
        let idx = self.streams.len();
        self.streams.push(RewardStream::new(token, distributor, duration));
        self.index.insert(token, idx);
        Ok(idx)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.index.contains_key(token)
    }

    pub fn index_of(&self, token: &Address) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Index of `token`, or `UnknownStream`.
    pub fn require(&self, token: &Address) -> Result<usize, RewardsError> {
        self.index_of(token)
            .ok_or(RewardsError::UnknownStream(*token))
    }

    pub fn get(&self, idx: usize) -> Option<&RewardStream> {
        self.streams.get(idx)
    }

    pub fn by_token(&self, token: &Address) -> Option<&RewardStream> {
        self.index_of(token).and_then(|idx| self.streams.get(idx))
    }

    pub fn token_at(&self, idx: usize) -> Option<Address> {
        self.streams.get(idx).map(|s| s.token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RewardStream> {
        self.streams.iter()
    }

    /// Overwrite the stream at `idx`. The token identity must not change.
    pub(crate) fn replace(&mut self, idx: usize, stream: RewardStream) {
        debug_assert_eq!(self.streams[idx].token, stream.token);
        self.streams[idx] = stream;
    }
}
