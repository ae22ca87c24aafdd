use crate::StoreError;
use multirewards_types::Address;

/// A complete ledger image, written by [`LedgerStore::replace_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub meta: Vec<(Vec<u8>, Vec<u8>)>,
    pub streams: Vec<(u32, Vec<u8>)>,
    pub accounts: Vec<(Address, Vec<u8>)>,
}

/// Store trait for persisting ledger state to durable storage.
///
/// Uses opaque `Vec<u8>` so the store doesn't depend on the engine crate.
/// The engine serializes/deserializes its own record types.
///
/// - streams are keyed by their registration index (dense, insertion order)
/// - accounts are keyed by participant address
/// - meta holds singleton records (ownership, token identities, totals)
pub trait LedgerStore {
    fn get_stream(&self, index: u32) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_stream(&self, index: u32, record: &[u8]) -> Result<(), StoreError>;
    /// All stream records, ordered by index.
    fn iter_streams(&self) -> Result<Vec<(u32, Vec<u8>)>, StoreError>;

    fn get_account(&self, address: &Address) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_account(&self, address: &Address, record: &[u8]) -> Result<(), StoreError>;
    fn iter_accounts(&self) -> Result<Vec<(Address, Vec<u8>)>, StoreError>;

    fn get_meta(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put_meta(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Replace everything stored with `snapshot` in one atomic write.
    ///
    /// Either every record lands and records missing from the snapshot are
    /// removed, or the store is left exactly as it was.
    fn replace_all(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError>;
}
