//! Links users to the transactions they sent or received, and keeps the link
//! table free of duplicate rows.

pub mod associator;
pub mod cache;
pub mod cleaner;
pub mod store;

pub use associator::{process_tx_batch, AssociationRunner, BatchOutcome, RunSummary};
pub use cache::AddressCache;
pub use cleaner::clean_duplicate_associations;
pub use store::PgAssociationStore;
