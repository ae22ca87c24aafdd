//! LMDB storage backend for the MultiRewards ledger.
//!
//! Implements [`multirewards_store::LedgerStore`] using the `heed` LMDB bindings.
//! Streams, accounts and metadata each live in their own named database
//! within a single environment. Whole-ledger saves go through one write
//! transaction ([`LedgerWriteBatch`]).

pub mod environment;
pub mod error;
pub mod ledger;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use ledger::LmdbLedgerStore;
pub use write_batch::LedgerWriteBatch;
