pub mod association;
pub mod eth_transaction;
pub mod external_address;
pub mod reaction;
pub mod sync_marker;
pub mod user;

pub use association::*;
pub use eth_transaction::*;
pub use external_address::*;
pub use reaction::*;
pub use sync_marker::*;
pub use user::*;

/// Rows per INSERT statement, keeps bind parameters under the Postgres limit.
pub const INSERT_CHUNK_SIZE: usize = 1_000;
