use std::sync::Arc;

use anyhow::Result;
use diesel::{
    insert_into,
    sql_types::{BigInt, Text},
    QueryableByName,
};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

use super::{sync_marker::upsert_marker, INSERT_CHUNK_SIZE};
use crate::{models::NewAssociation, schema::user_eth_transactions, DbPool};

#[derive(QueryableByName, Debug)]
struct DuplicatePair {
    #[diesel(sql_type = BigInt)]
    user_fid: i64,
    #[diesel(sql_type = Text)]
    eth_transaction_unique_id: String,
}

/// Insert a batch of associations and advance the marker in one transaction.
pub async fn commit_association_batch(
    db: Arc<DbPool>,
    associations: &[NewAssociation],
    marker_name: &str,
    last_key: &str,
) -> Result<usize> {
    let mut conn = db.get().await?;
    let inserted = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let mut inserted = 0;
                for chunk in associations.chunks(INSERT_CHUNK_SIZE) {
                    inserted += insert_into(user_eth_transactions::table)
                        .values(chunk)
                        .execute(conn)
                        .await?;
                }
                upsert_marker(conn, marker_name, last_key).await?;
                Ok(inserted)
            }
            .scope_boxed()
        })
        .await?;
    Ok(inserted)
}

/// Every (user, transaction) pair that has more than one association row.
pub async fn find_duplicate_pairs(db: Arc<DbPool>) -> Result<Vec<(i64, String)>> {
    let sql = r#"
        SELECT DISTINCT user_fid, eth_transaction_unique_id
        FROM (
            SELECT
                user_fid,
                eth_transaction_unique_id,
                ROW_NUMBER() OVER (
                    PARTITION BY user_fid, eth_transaction_unique_id
                    ORDER BY id
                ) AS row_number
            FROM user_eth_transactions
        ) ranked
        WHERE row_number > 1
        ORDER BY user_fid, eth_transaction_unique_id
    "#;

    let mut conn = db.get().await?;
    let pairs: Vec<DuplicatePair> = diesel::sql_query(sql).load(&mut conn).await?;
    Ok(pairs.into_iter().map(|p| (p.user_fid, p.eth_transaction_unique_id)).collect())
}

/// Delete every row of a pair except the earliest one. Runs as its own statement,
/// so each pair commits independently.
pub async fn delete_duplicates_for_pair(
    db: Arc<DbPool>,
    user_fid: i64,
    eth_transaction_unique_id: &str,
) -> Result<usize> {
    let sql = r#"
        DELETE FROM user_eth_transactions
        WHERE id IN (
            SELECT id FROM (
                SELECT id, ROW_NUMBER() OVER (ORDER BY id) AS row_number
                FROM user_eth_transactions
                WHERE user_fid = $1 AND eth_transaction_unique_id = $2
            ) ranked
            WHERE row_number > 1
        )
    "#;

    let mut conn = db.get().await?;
    let deleted = diesel::sql_query(sql)
        .bind::<BigInt, _>(user_fid)
        .bind::<Text, _>(eth_transaction_unique_id)
        .execute(&mut conn)
        .await?;
    Ok(deleted)
}
