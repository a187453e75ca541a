use std::{collections::HashMap, sync::Arc};

use anyhow::Result;
use diesel::{insert_into, prelude::*};
use diesel_async::{scoped_futures::ScopedFutureExt, AsyncConnection, RunQueryDsl};

use super::INSERT_CHUNK_SIZE;
use crate::{
    models::{Erc1155MetadataModel, EthTransactionModel},
    schema::{erc1155_metadata, eth_transactions},
    DbPool,
};

/// Insert transfers together with their ERC-1155 metadata in a single transaction.
/// Returns the number of new transaction rows.
pub async fn insert_transactions(
    db: Arc<DbPool>,
    txs: &[EthTransactionModel],
    metadata: &[Erc1155MetadataModel],
) -> Result<usize> {
    if txs.is_empty() {
        return Ok(0);
    }
    let mut conn = db.get().await?;
    let inserted = conn
        .transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                let mut inserted = 0;
                for chunk in txs.chunks(INSERT_CHUNK_SIZE) {
                    inserted += insert_into(eth_transactions::table)
                        .values(chunk)
                        .on_conflict(eth_transactions::unique_id)
                        .do_nothing()
                        .execute(conn)
                        .await?;
                }
                for chunk in metadata.chunks(INSERT_CHUNK_SIZE) {
                    insert_into(erc1155_metadata::table)
                        .values(chunk)
                        .on_conflict((
                            erc1155_metadata::eth_transaction_hash,
                            erc1155_metadata::token_id,
                        ))
                        .do_nothing()
                        .execute(conn)
                        .await?;
                }
                Ok(inserted)
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(
        "Inserted {} transactions ({} fetched, {} erc1155 metadata rows)",
        inserted,
        txs.len(),
        metadata.len()
    );
    Ok(inserted)
}

/// Next window of transactions ordered by `unique_id`, strictly after `after` when given.
pub async fn load_transactions_after(
    db: Arc<DbPool>,
    after: Option<&str>,
    limit: i64,
) -> Result<Vec<EthTransactionModel>> {
    let mut conn = db.get().await?;
    let mut query = eth_transactions::table
        .select(EthTransactionModel::as_select())
        .order_by(eth_transactions::unique_id.asc())
        .limit(limit)
        .into_boxed();
    if let Some(after) = after {
        query = query.filter(eth_transactions::unique_id.gt(after.to_string()));
    }
    let txs = query.load(&mut conn).await?;
    Ok(txs)
}

/// Highest stored block per owning address.
pub async fn latest_blocks_for_addresses(
    db: Arc<DbPool>,
    addresses: &[String],
) -> Result<HashMap<String, i64>> {
    if addresses.is_empty() {
        return Ok(HashMap::new());
    }
    let mut conn = db.get().await?;
    let rows: Vec<(String, Option<i64>)> = eth_transactions::table
        .filter(eth_transactions::address_external.eq_any(addresses))
        .group_by(eth_transactions::address_external)
        .select((eth_transactions::address_external, diesel::dsl::max(eth_transactions::block_num)))
        .load(&mut conn)
        .await?;
    Ok(rows.into_iter().filter_map(|(address, block)| block.map(|b| (address, b))).collect())
}
