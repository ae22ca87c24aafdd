//! Saving and restoring the ledger through a [`LedgerStore`].
//!
//! Records are `bincode`-encoded:
//! - meta `ledger`: identities, pause flag and total principal
//! - one stream record per registry index
//! - one account record per participant: staked balance plus checkpoints
//!
//! A save replaces the stored image in one atomic write.

use crate::accrual::{CheckpointBook, UserCheckpoint};
use crate::controller::MultiRewards;
use crate::error::RewardsError;
use crate::principal::PrincipalLedger;
use crate::registry::{RewardStream, StreamRegistry};
use crate::state::LedgerState;
use multirewards_store::{LedgerSnapshot, LedgerStore, StoreError};
use multirewards_types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

const META_KEY: &[u8] = b"ledger";

#[derive(Debug, Serialize, Deserialize)]
struct LedgerMeta {
    owner: Address,
    staking_token: Address,
    custody: Address,
    paused: bool,
    total_principal: u128,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccountRecord {
    principal: u128,
    checkpoints: Vec<UserCheckpoint>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, RewardsError> {
    bincode::serialize(value).map_err(|e| RewardsError::Serialization(e.to_string()))
}

fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, RewardsError> {
    bincode::deserialize(bytes).map_err(|e| RewardsError::Serialization(e.to_string()))
}

impl MultiRewards {
    /// Persist the full ledger state, replacing whatever `store` held.
    pub fn save_to_store(&self, store: &dyn LedgerStore) -> Result<(), RewardsError> {
        let state = self.state();
        let meta = LedgerMeta {
            owner: state.owner,
            staking_token: state.staking_token,
            custody: state.custody,
            paused: state.paused,
            total_principal: state.principal.total(),
        };
        let mut snapshot = LedgerSnapshot {
            meta: vec![(META_KEY.to_vec(), encode(&meta)?)],
            ..LedgerSnapshot::default()
        };

        for (idx, stream) in state.registry.iter().enumerate() {
            let key = u32::try_from(idx).map_err(|_| RewardsError::Overflow)?;
            snapshot.streams.push((key, encode(stream)?));
        }

        let accounts: BTreeSet<&Address> = state
            .principal
            .accounts()
            .map(|(addr, _)| addr)
            .chain(state.checkpoints.accounts())
            .collect();
        for account in accounts {
            let record = AccountRecord {
                principal: state.principal.balance_of(account),
                checkpoints: state.checkpoints.slots(account).to_vec(),
            };
            snapshot.accounts.push((*account, encode(&record)?));
        }

        store.replace_all(&snapshot)?;
        info!(
            streams = snapshot.streams.len(),
            accounts = snapshot.accounts.len(),
            "ledger saved"
        );
        Ok(())
    }

    /// Restore a ledger saved with [`MultiRewards::save_to_store`].
    ///
    /// Fails with `Store(Corruption)` if stream indexes are not dense or the
    /// principal total disagrees with the account balances.
    pub fn load_from_store(store: &dyn LedgerStore) -> Result<Self, RewardsError> {
        let meta: LedgerMeta = match store.get_meta(META_KEY)? {
            Some(bytes) => decode(&bytes)?,
            None => return Err(StoreError::NotFound("ledger metadata".into()).into()),
        };

        let mut streams = Vec::new();
        for (expected, (idx, bytes)) in store.iter_streams()?.into_iter().enumerate() {
            if idx as usize != expected {
                return Err(StoreError::Corruption(format!(
                    "stream index {idx} found where {expected} was expected"
                ))
                .into());
            }
            let stream: RewardStream = decode(&bytes)?;
            streams.push(stream);
        }
        let registry = StreamRegistry::from_streams(streams)
            .map_err(|e| StoreError::Corruption(e.to_string()))?;

        let mut balances = HashMap::new();
        let mut checkpoints = CheckpointBook::new();
        for (account, bytes) in store.iter_accounts()? {
            let record: AccountRecord = decode(&bytes)?;
            if record.checkpoints.len() > registry.len() {
                return Err(StoreError::Corruption(format!(
                    "account {account} has checkpoints for unknown streams"
                ))
                .into());
            }
            balances.insert(account, record.principal);
            if !record.checkpoints.is_empty() {
                checkpoints.insert_slots(account, record.checkpoints);
            }
        }

        let principal = PrincipalLedger::from_parts(balances, meta.total_principal);
        if !principal.is_conserved() {
            return Err(StoreError::Corruption(format!(
                "total principal {} does not match account balances",
                meta.total_principal
            ))
            .into());
        }

        info!(streams = registry.len(), accounts = principal.len(), "ledger loaded");
        Ok(Self::from_state(LedgerState {
            owner: meta.owner,
            staking_token: meta.staking_token,
            custody: meta.custody,
            paused: meta.paused,
            principal,
            registry,
            checkpoints,
        }))
    }
}
