//! LMDB environment setup.

use crate::error::LmdbError;
use crate::ledger::LmdbLedgerStore;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

const MAX_DBS: u32 = 3;

/// Wraps the LMDB environment and the ledger's database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    streams_db: Database<Bytes, Bytes>,
    accounts_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment in the directory `path`.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process per path, and
        // the memory map is not modified outside of heed.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let streams_db = env.create_database(&mut wtxn, Some("streams"))?;
        let accounts_db = env.create_database(&mut wtxn, Some("accounts"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        info!(path = %path.display(), map_size, "LMDB environment opened");
        Ok(Self {
            env: Arc::new(env),
            streams_db,
            accounts_db,
            meta_db,
        })
    }

    /// A [`multirewards_store::LedgerStore`] over this environment.
    pub fn ledger_store(&self) -> LmdbLedgerStore {
        LmdbLedgerStore::new(
            Arc::clone(&self.env),
            self.streams_db,
            self.accounts_db,
            self.meta_db,
        )
    }
}
