use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use diesel::{prelude::*, OptionalExtension};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{models::SyncMarkerModel, schema::sync_markers, DbPool};

/// The marker row of a resumable job, if it ever committed a batch.
pub async fn get_marker_record(db: Arc<DbPool>, marker_name: &str) -> Result<Option<SyncMarkerModel>> {
    let mut conn = db.get().await?;
    let marker = sync_markers::table
        .filter(sync_markers::name.eq(marker_name))
        .select(SyncMarkerModel::as_select())
        .first(&mut conn)
        .await
        .optional()?;
    Ok(marker)
}

/// Last committed key of a resumable job.
pub async fn get_marker(db: Arc<DbPool>, marker_name: &str) -> Result<Option<String>> {
    Ok(get_marker_record(db, marker_name).await?.map(|marker| marker.last_key))
}

/// Move a marker forward. Meant to run inside the transaction of the batch it covers.
pub async fn upsert_marker(
    conn: &mut AsyncPgConnection,
    marker_name: &str,
    last_key: &str,
) -> Result<usize, diesel::result::Error> {
    let marker = SyncMarkerModel::new(marker_name, last_key, Utc::now().naive_utc());
    diesel::insert_into(sync_markers::table)
        .values(&marker)
        .on_conflict(sync_markers::name)
        .do_update()
        .set((sync_markers::last_key.eq(&marker.last_key), sync_markers::updated_at.eq(marker.updated_at)))
        .execute(conn)
        .await
}
