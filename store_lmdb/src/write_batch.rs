//! Write batching: groups ledger writes into a single LMDB write transaction.
//!
//! ```ignore
//! let mut batch = store.write_batch()?;
//! batch.clear()?;
//! batch.put_meta(b"ledger", &meta_bytes)?;
//! batch.put_stream(0, &stream_bytes)?;
//! batch.commit()?;
//! ```
//!
//! Dropping a batch without calling [`LedgerWriteBatch::commit`] aborts the
//! transaction and leaves the store untouched.

use heed::types::Bytes;
use heed::{Database, RwTxn};
use multirewards_store::StoreError;
use multirewards_types::Address;

use crate::LmdbError;

/// Pending writes to the streams, accounts and meta databases.
pub struct LedgerWriteBatch<'a> {
    txn: RwTxn<'a>,
    streams_db: Database<Bytes, Bytes>,
    accounts_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl<'a> LedgerWriteBatch<'a> {
    pub(crate) fn new(
        txn: RwTxn<'a>,
        streams_db: Database<Bytes, Bytes>,
        accounts_db: Database<Bytes, Bytes>,
        meta_db: Database<Bytes, Bytes>,
    ) -> Self {
        Self {
            txn,
            streams_db,
            accounts_db,
            meta_db,
        }
    }

    /// Remove every stream, account and meta record.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.streams_db.clear(&mut self.txn).map_err(LmdbError::from)?;
        self.accounts_db.clear(&mut self.txn).map_err(LmdbError::from)?;
        self.meta_db.clear(&mut self.txn).map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_stream(&mut self, index: u32, record: &[u8]) -> Result<(), StoreError> {
        self.streams_db
            .put(&mut self.txn, &index.to_be_bytes(), record)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_account(&mut self, address: &Address, record: &[u8]) -> Result<(), StoreError> {
        self.accounts_db
            .put(&mut self.txn, address.as_bytes(), record)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    pub fn put_meta(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.meta_db
            .put(&mut self.txn, key, value)
            .map_err(LmdbError::from)?;
        Ok(())
    }

    /// Commit every write in the batch.
    pub fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
