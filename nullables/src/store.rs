//! Nullable store: thread-safe in-memory ledger storage for testing.

use multirewards_store::{LedgerSnapshot, LedgerStore, StoreError};
use multirewards_types::Address;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// An in-memory [`LedgerStore`].
///
/// A failure can be injected into the next [`LedgerStore::replace_all`] with
/// [`NullStore::fail_next_write`].
pub struct NullStore {
    streams: Mutex<BTreeMap<u32, Vec<u8>>>,
    accounts: Mutex<HashMap<Address, Vec<u8>>>,
    meta: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    injected: Mutex<Option<StoreError>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(BTreeMap::new()),
            accounts: Mutex::new(HashMap::new()),
            meta: Mutex::new(HashMap::new()),
            injected: Mutex::new(None),
        }
    }

    /// Make the next [`LedgerStore::replace_all`] call fail with `error`.
    pub fn fail_next_write(&self, error: StoreError) {
        *self.injected.lock().unwrap() = Some(error);
    }

    pub fn stream_count(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for NullStore {
    fn get_stream(&self, index: u32) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.streams.lock().unwrap().get(&index).cloned())
    }

    fn put_stream(&self, index: u32, record: &[u8]) -> Result<(), StoreError> {
        self.streams.lock().unwrap().insert(index, record.to_vec());
        Ok(())
    }

    fn iter_streams(&self) -> Result<Vec<(u32, Vec<u8>)>, StoreError> {
        Ok(self
            .streams
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn get_account(&self, address: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    fn put_account(&self, address: &Address, record: &[u8]) -> Result<(), StoreError> {
        self.accounts
            .lock()
            .unwrap()
            .insert(*address, record.to_vec());
        Ok(())
    }

    fn iter_accounts(&self) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect())
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn replace_all(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        if let Some(error) = self.injected.lock().unwrap().take() {
            return Err(error);
        }
        let mut streams = self.streams.lock().unwrap();
        let mut accounts = self.accounts.lock().unwrap();
        let mut meta = self.meta.lock().unwrap();
        *streams = snapshot.streams.iter().cloned().collect();
        *accounts = snapshot.accounts.iter().cloned().collect();
        *meta = snapshot.meta.iter().cloned().collect();
        Ok(())
    }
}
