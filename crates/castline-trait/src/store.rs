use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use castline_types::{EthTransactionModel, NewAssociation};

/// Storage used by the user/transaction associator.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Resumption marker of the associator, `None` before the first committed batch.
    async fn read_marker(&self) -> Result<Option<String>>;

    /// Up to `limit` transactions ordered by unique id, strictly after `after`.
    async fn load_batch(&self, after: Option<String>, limit: i64) -> Result<Vec<EthTransactionModel>>;

    /// Users owning any of the given addresses, keyed by address.
    async fn resolve_addresses(&self, addresses: &HashSet<String>) -> Result<HashMap<String, i64>>;

    /// Persist the associations of one batch and advance the marker to `last_key`, atomically.
    async fn commit_batch(&self, associations: Vec<NewAssociation>, last_key: String) -> Result<usize>;
}

/// Maintenance queries on the association table.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait AssociationMaintenance: Send + Sync {
    /// (user fid, transaction unique id) pairs with more than one row.
    async fn duplicate_pairs(&self) -> Result<Vec<(i64, String)>>;

    /// Remove all rows of the pair but the first to arrive, committing on its own.
    async fn delete_duplicates(&self, user_fid: i64, eth_transaction_unique_id: String) -> Result<usize>;
}
