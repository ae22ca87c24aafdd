use crate::error::LmdbError;
use crate::write_batch::LedgerWriteBatch;
use heed::types::Bytes;
use heed::{Database, Env};
use multirewards_store::{LedgerSnapshot, LedgerStore, StoreError};
use tracing::debug;
use multirewards_types::Address;
use std::sync::Arc;

/// LMDB-backed [`LedgerStore`].
///
/// Stream keys are big-endian `u32` so LMDB's byte ordering matches index
/// order. Account keys are the raw 20 address bytes.
pub struct LmdbLedgerStore {
    env: Arc<Env>,
    streams_db: Database<Bytes, Bytes>,
    accounts_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbLedgerStore {
    pub fn new(
        env: Arc<Env>,
        streams_db: Database<Bytes, Bytes>,
        accounts_db: Database<Bytes, Bytes>,
        meta_db: Database<Bytes, Bytes>,
    ) -> Self {
        Self {
            env,
            streams_db,
            accounts_db,
            meta_db,
        }
    }

    /// Begin a batch of writes committed in one transaction.
    pub fn write_batch(&self) -> Result<LedgerWriteBatch<'_>, StoreError> {
        let txn = self.env.write_txn().map_err(LmdbError::from)?;
        Ok(LedgerWriteBatch::new(
            txn,
            self.streams_db,
            self.accounts_db,
            self.meta_db,
        ))
    }

    fn get(&self, db: Database<Bytes, Bytes>, key: &[u8]) -> Result<Option<Vec<u8>>, LmdbError> {
        let txn = self.env.read_txn()?;
        Ok(db.get(&txn, key)?.map(<[u8]>::to_vec))
    }

    fn put(&self, db: Database<Bytes, Bytes>, key: &[u8], value: &[u8]) -> Result<(), LmdbError> {
        let mut txn = self.env.write_txn()?;
        db.put(&mut txn, key, value)?;
        txn.commit()?;
        Ok(())
    }

    fn entries(&self, db: Database<Bytes, Bytes>) -> Result<Vec<(Vec<u8>, Vec<u8>)>, LmdbError> {
        let txn = self.env.read_txn()?;
        let mut results = Vec::new();
        for item in db.iter(&txn)? {
            let (key, val) = item?;
            results.push((key.to_vec(), val.to_vec()));
        }
        Ok(results)
    }
}

impl LedgerStore for LmdbLedgerStore {
    fn get_stream(&self, index: u32) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(self.streams_db, &index.to_be_bytes())?)
    }

    fn put_stream(&self, index: u32, record: &[u8]) -> Result<(), StoreError> {
        Ok(self.put(self.streams_db, &index.to_be_bytes(), record)?)
    }

    fn iter_streams(&self) -> Result<Vec<(u32, Vec<u8>)>, StoreError> {
        self.entries(self.streams_db)?
            .into_iter()
            .map(|(key, val)| -> Result<(u32, Vec<u8>), StoreError> {
                let bytes: [u8; 4] = key.as_slice().try_into().map_err(|_| LmdbError::MalformedKey {
                    db: "streams",
                    len: key.len(),
                })?;
                Ok((u32::from_be_bytes(bytes), val))
            })
            .collect()
    }

    fn get_account(&self, address: &Address) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(self.accounts_db, address.as_bytes())?)
    }

    fn put_account(&self, address: &Address, record: &[u8]) -> Result<(), StoreError> {
        Ok(self.put(self.accounts_db, address.as_bytes(), record)?)
    }

    fn iter_accounts(&self) -> Result<Vec<(Address, Vec<u8>)>, StoreError> {
        self.entries(self.accounts_db)?
            .into_iter()
            .map(|(key, val)| -> Result<(Address, Vec<u8>), StoreError> {
                let address = Address::from_slice(&key).map_err(|_| LmdbError::MalformedKey {
                    db: "accounts",
                    len: key.len(),
                })?;
                Ok((address, val))
            })
            .collect()
    }

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(self.meta_db, key)?)
    }

    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        Ok(self.put(self.meta_db, key, value)?)
    }

    fn replace_all(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        let mut batch = self.write_batch()?;
        batch.clear()?;
        for (key, value) in &snapshot.meta {
            batch.put_meta(key, value)?;
        }
        for (index, record) in &snapshot.streams {
            batch.put_stream(*index, record)?;
        }
        for (address, record) in &snapshot.accounts {
            batch.put_account(address, record)?;
        }
        batch.commit()?;
        debug!(
            streams = snapshot.streams.len(),
            accounts = snapshot.accounts.len(),
            "ledger snapshot committed"
        );
        Ok(())
    }
}
