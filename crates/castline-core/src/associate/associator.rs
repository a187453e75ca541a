use std::collections::HashSet;

use anyhow::{Context, Result};
use castline_trait::store::AssociationStore;
use castline_types::{EthTransactionModel, NewAssociation, DEFAULT_ASSOCIATION_BATCH_SIZE};

use super::cache::AddressCache;

/// What one committed batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub transactions: usize,
    /// Addresses resolved by the store for this batch, cache hits excluded.
    pub resolved: usize,
    pub associations: usize,
}

/// Totals of an associator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub transactions: usize,
    pub associations: usize,
    pub last_key: Option<String>,
}

/// Distinct sender and receiver addresses of a batch.
pub fn distinct_addresses(batch: &[EthTransactionModel]) -> HashSet<String> {
    batch
        .iter()
        .flat_map(|tx| std::iter::once(&tx.from_address).chain(tx.to_address.as_ref()))
        .cloned()
        .collect()
}

/// Associations of a batch given resolved addresses. A transaction links its
/// sender, and its receiver when the receiver is a different user.
pub fn build_associations(batch: &[EthTransactionModel], cache: &AddressCache) -> Vec<NewAssociation> {
    let mut associations = Vec::new();

    for tx in batch {
        let from_fid = cache.get(&tx.from_address);
        let to_fid = tx.to_address.as_deref().and_then(|address| cache.get(address));

        if let Some(fid) = from_fid {
            associations.push(NewAssociation::new(fid, tx.unique_id.as_str()));
        }
        if let Some(fid) = to_fid {
            if Some(fid) != from_fid {
                associations.push(NewAssociation::new(fid, tx.unique_id.as_str()));
            }
        }
    }

    associations
}

/// Associate one batch of transactions and commit the links together with the
/// advanced resumption marker.
///
/// Only addresses missing from `cache` are resolved against the store, and
/// everything resolved is added to the cache for later batches.
pub async fn process_tx_batch<S>(
    store: &S,
    batch: &[EthTransactionModel],
    cache: &mut AddressCache,
) -> Result<BatchOutcome>
where
    S: AssociationStore + ?Sized,
{
    let Some(last) = batch.last() else {
        return Ok(BatchOutcome::default());
    };

    let addresses = distinct_addresses(batch);
    let missing = cache.missing(&addresses);

    let mut resolved = 0;
    if !missing.is_empty() {
        let found = store
            .resolve_addresses(&missing)
            .await
            .context("Failed to resolve transaction addresses")?;
        resolved = found.len();
        tracing::debug!(
            "Resolved {} of {} uncached addresses ({} distinct in batch)",
            resolved,
            missing.len(),
            addresses.len()
        );
        cache.extend(found);
    }

    let associations = build_associations(batch, cache);
    let count = associations.len();

    store
        .commit_batch(associations, last.unique_id.clone())
        .await
        .with_context(|| format!("Failed to commit associations up to {}", last.unique_id))?;

    Ok(BatchOutcome { transactions: batch.len(), resolved, associations: count })
}

/// Walks the transaction table in unique id order from the stored marker and
/// associates every batch. The address cache lives as long as the runner.
pub struct AssociationRunner<S> {
    store: S,
    batch_size: i64,
    cache: AddressCache,
}

impl<S: AssociationStore> AssociationRunner<S> {
    pub fn new(store: S) -> Self {
        Self { store, batch_size: DEFAULT_ASSOCIATION_BATCH_SIZE, cache: AddressCache::new() }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut marker = self.store.read_marker().await.context("Failed to read association marker")?;
        let mut summary = RunSummary { last_key: marker.clone(), ..Default::default() };

        match &marker {
            Some(key) => tracing::info!("Resuming association after unique_id {}", key),
            None => tracing::info!("Starting association from the first transaction"),
        }

        loop {
            let batch = self
                .store
                .load_batch(marker.clone(), self.batch_size)
                .await
                .context("Failed to load transaction batch")?;
            if batch.is_empty() {
                break;
            }

            tracing::info!(
                "Processing {} transactions after unique_id {}",
                batch.len(),
                marker.as_deref().unwrap_or("<start>")
            );

            let outcome = process_tx_batch(&self.store, &batch, &mut self.cache).await?;
            let last_key = batch.last().map(|tx| tx.unique_id.clone());

            summary.batches += 1;
            summary.transactions += outcome.transactions;
            summary.associations += outcome.associations;
            summary.last_key = last_key.clone();

            tracing::info!(
                "Committed {} associations, {} addresses cached",
                outcome.associations,
                self.cache.len()
            );

            if (batch.len() as i64) < self.batch_size {
                break;
            }
            marker = last_key;
        }

        tracing::info!(
            "Association run finished: {} batches, {} transactions, {} associations",
            summary.batches,
            summary.transactions,
            summary.associations
        );
        Ok(summary)
    }
}
