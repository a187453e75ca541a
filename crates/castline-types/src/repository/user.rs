use std::sync::Arc;

use anyhow::Result;
use diesel::{prelude::*, upsert::excluded};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

use super::INSERT_CHUNK_SIZE;
use crate::{
    models::{LocationModel, UserModel},
    schema::{locations, users},
    DbPool,
};

/// Insert locations, overwriting the description of known ids.
pub async fn upsert_locations(db: Arc<DbPool>, models: &[LocationModel]) -> Result<usize> {
    if models.is_empty() {
        return Ok(0);
    }
    let mut conn = db.get().await?;
    let mut affected = 0;
    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        affected += diesel::insert_into(locations::table)
            .values(chunk)
            .on_conflict(locations::id)
            .do_update()
            .set(locations::description.eq(excluded(locations::description)))
            .execute(&mut conn)
            .await?;
    }
    tracing::info!("Upserted {} locations", affected);
    Ok(affected)
}

/// Insert users or refresh their profile fields.
///
/// Enrichment columns are left as they are on conflict so a profile refresh
/// never erases a previously resolved address.
pub async fn upsert_users(db: Arc<DbPool>, models: &[UserModel]) -> Result<usize> {
    if models.is_empty() {
        return Ok(0);
    }
    let mut conn = db.get().await?;
    let mut affected = 0;
    for chunk in models.chunks(INSERT_CHUNK_SIZE) {
        affected += diesel::insert_into(users::table)
            .values(chunk)
            .on_conflict(users::fid)
            .do_update()
            .set((
                users::username.eq(excluded(users::username)),
                users::display_name.eq(excluded(users::display_name)),
                users::pfp_url.eq(excluded(users::pfp_url)),
                users::bio_text.eq(excluded(users::bio_text)),
                users::following_count.eq(excluded(users::following_count)),
                users::follower_count.eq(excluded(users::follower_count)),
                users::location_id.eq(excluded(users::location_id)),
                users::verified.eq(excluded(users::verified)),
            ))
            .execute(&mut conn)
            .await?;
    }
    tracing::info!("Upserted {} users", affected);
    Ok(affected)
}

/// Write the enrichment columns of already stored users in one transaction.
pub async fn update_user_enrichment(db: Arc<DbPool>, models: &[UserModel]) -> Result<usize> {
    if models.is_empty() {
        return Ok(0);
    }
    let mut conn = db.get().await?;
    let updated = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let mut updated = 0;
                for user in models {
                    updated += diesel::update(users::table.filter(users::fid.eq(user.fid)))
                        .set((
                            users::farcaster_address.eq(&user.farcaster_address),
                            users::external_address.eq(&user.external_address),
                            users::registered_at.eq(user.registered_at),
                        ))
                        .execute(conn)
                        .await?;
                }
                Ok(updated)
            }
            .scope_boxed()
        })
        .await?;
    tracing::info!("Enriched {} users", updated);
    Ok(updated)
}

/// Resolve external addresses to user fids. Addresses without a user are absent from the result.
pub async fn find_fids_by_addresses(
    db: Arc<DbPool>,
    addresses: &[String],
) -> Result<Vec<(String, i64)>> {
    if addresses.is_empty() {
        return Ok(Vec::new());
    }
    let mut conn = db.get().await?;
    let rows: Vec<(Option<String>, i64)> = users::table
        .filter(users::external_address.eq_any(addresses))
        .select((users::external_address, users::fid))
        .load(&mut conn)
        .await?;
    Ok(rows.into_iter().filter_map(|(address, fid)| address.map(|a| (a, fid))).collect())
}

/// Distinct external addresses of all known users, sorted.
pub async fn list_external_addresses(db: Arc<DbPool>) -> Result<Vec<String>> {
    let mut conn = db.get().await?;
    let addresses: Vec<Option<String>> = users::table
        .filter(users::external_address.is_not_null())
        .select(users::external_address)
        .distinct()
        .order_by(users::external_address)
        .load(&mut conn)
        .await?;
    Ok(addresses.into_iter().flatten().collect())
}
