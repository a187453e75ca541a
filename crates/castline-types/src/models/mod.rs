pub mod association;
pub mod eth_transaction;
pub mod external_address;
pub mod reaction;
pub mod sync_marker;
pub mod user;

pub use association::NewAssociation;
pub use eth_transaction::{Erc1155MetadataModel, EthTransactionModel};
pub use external_address::ExternalAddressModel;
pub use reaction::ReactionModel;
pub use sync_marker::SyncMarkerModel;
pub use user::{LocationModel, UserEnrichment, UserModel};
