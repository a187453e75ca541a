use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::Result;
use async_trait::async_trait;
use castline_trait::store::{AssociationMaintenance, AssociationStore};
use castline_types::{
    repository, DbPool, EthTransactionModel, NewAssociation, ASSOCIATION_MARKER,
};

/// Postgres-backed association storage.
#[derive(Clone)]
pub struct PgAssociationStore {
    db_pool: Arc<DbPool>,
    marker_name: String,
}

impl PgAssociationStore {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool, marker_name: ASSOCIATION_MARKER.to_string() }
    }
}

#[async_trait]
impl AssociationStore for PgAssociationStore {
    async fn read_marker(&self) -> Result<Option<String>> {
        repository::get_marker(self.db_pool.clone(), &self.marker_name).await
    }

    async fn load_batch(&self, after: Option<String>, limit: i64) -> Result<Vec<EthTransactionModel>> {
        repository::load_transactions_after(self.db_pool.clone(), after.as_deref(), limit).await
    }

    async fn resolve_addresses(&self, addresses: &HashSet<String>) -> Result<HashMap<String, i64>> {
        let addresses: Vec<String> = addresses.iter().cloned().collect();
        let pairs = repository::find_fids_by_addresses(self.db_pool.clone(), &addresses).await?;
        Ok(pairs.into_iter().collect())
    }

    async fn commit_batch(&self, associations: Vec<NewAssociation>, last_key: String) -> Result<usize> {
        repository::commit_association_batch(
            self.db_pool.clone(),
            &associations,
            &self.marker_name,
            &last_key,
        )
        .await
    }
}

#[async_trait]
impl AssociationMaintenance for PgAssociationStore {
    async fn duplicate_pairs(&self) -> Result<Vec<(i64, String)>> {
        repository::find_duplicate_pairs(self.db_pool.clone()).await
    }

    async fn delete_duplicates(&self, user_fid: i64, eth_transaction_unique_id: String) -> Result<usize> {
        repository::delete_duplicates_for_pair(self.db_pool.clone(), user_fid, &eth_transaction_unique_id)
            .await
    }
}
