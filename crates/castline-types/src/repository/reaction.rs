use std::sync::Arc;

use anyhow::Result;
use diesel::insert_into;
use diesel_async::RunQueryDsl;

use super::INSERT_CHUNK_SIZE;
use crate::{models::ReactionModel, schema::reactions, DbPool};

/// Insert reactions, ignoring hashes already stored.
pub async fn insert_reactions(db: Arc<DbPool>, models: &[ReactionModel]) -> Result<usize> {
    if models.is_empty() {
        return Ok(0);
    }
    let mut conn = db.get().await?;
    let mut inserted = 0;
    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        inserted += insert_into(reactions::table)
            .values(chunk)
            .on_conflict(reactions::hash)
            .do_nothing()
            .execute(&mut conn)
            .await?;
    }
    tracing::info!("Inserted {} reactions ({} fetched)", inserted, models.len());
    Ok(inserted)
}
