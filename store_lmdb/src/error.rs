use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed key in {db}: {len} bytes")]
    MalformedKey { db: &'static str, len: usize },
}

impl From<LmdbError> for multirewards_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::MalformedKey { .. } => multirewards_store::StoreError::Corruption(e.to_string()),
            other => multirewards_store::StoreError::Backend(other.to_string()),
        }
    }
}
