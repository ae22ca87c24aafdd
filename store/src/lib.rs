//! Abstract boundaries for the MultiRewards ledger.
//!
//! Two external collaborators sit behind traits here:
//! - [`LedgerStore`]: durable persistence of streams, accounts and metadata.
//! - [`TokenBank`]: custody of the principal and reward tokens.
//!
//! The engine depends only on these traits.

pub mod custody;
pub mod error;
pub mod ledger;

pub use custody::{TokenBank, TokenError, Transfer};
pub use error::StoreError;
pub use ledger::{LedgerSnapshot, LedgerStore};
