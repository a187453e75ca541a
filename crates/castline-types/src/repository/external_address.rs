use std::sync::Arc;

use anyhow::Result;
use diesel::{insert_into, upsert::excluded, ExpressionMethods};
use diesel_async::RunQueryDsl;

use super::INSERT_CHUNK_SIZE;
use crate::{models::ExternalAddressModel, schema::external_addresses, DbPool};

/// Store resolved addresses. A re-fetched address replaces every column.
pub async fn upsert_external_addresses(
    db: Arc<DbPool>,
    models: &[ExternalAddressModel],
) -> Result<usize> {
    if models.is_empty() {
        return Ok(0);
    }
    let mut conn = db.get().await?;
    let mut affected = 0;
    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        affected += insert_into(external_addresses::table)
            .values(chunk)
            .on_conflict(external_addresses::address)
            .do_update()
            .set((
                external_addresses::ens.eq(excluded(external_addresses::ens)),
                external_addresses::url.eq(excluded(external_addresses::url)),
                external_addresses::github.eq(excluded(external_addresses::github)),
                external_addresses::twitter.eq(excluded(external_addresses::twitter)),
                external_addresses::telegram.eq(excluded(external_addresses::telegram)),
                external_addresses::email.eq(excluded(external_addresses::email)),
                external_addresses::discord.eq(excluded(external_addresses::discord)),
            ))
            .execute(&mut conn)
            .await?;
    }
    tracing::info!("Upserted {} external addresses", affected);
    Ok(affected)
}
