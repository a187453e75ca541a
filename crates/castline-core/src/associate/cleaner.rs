use anyhow::{Context, Result};
use castline_trait::store::AssociationMaintenance;

/// Remove duplicate user/transaction links, keeping the earliest row of each
/// pair. Every pair is deleted and committed on its own. Returns the number of
/// rows removed, zero when the table is already clean.
pub async fn clean_duplicate_associations<M>(store: &M) -> Result<usize>
where
    M: AssociationMaintenance + ?Sized,
{
    let pairs = store.duplicate_pairs().await.context("Failed to find duplicate associations")?;
    if pairs.is_empty() {
        tracing::info!("No duplicate associations found");
        return Ok(0);
    }

    tracing::info!("Found {} duplicated user/transaction pairs", pairs.len());

    let mut removed = 0;
    for (user_fid, unique_id) in pairs {
        let deleted = store
            .delete_duplicates(user_fid, unique_id.clone())
            .await
            .with_context(|| format!("Failed to delete duplicates of ({}, {})", user_fid, unique_id))?;
        tracing::debug!("Deleted {} duplicates of ({}, {})", deleted, user_fid, unique_id);
        removed += deleted;
    }

    tracing::info!("Deleted {} duplicate association rows", removed);
    Ok(removed)
}
