use chrono::NaiveDateTime;
use diesel::prelude::*;

/// Progress of a resumable job: the last key it committed.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::schema::sync_markers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SyncMarkerModel {
    pub name: String,
    pub last_key: String,
    pub updated_at: NaiveDateTime,
}

impl SyncMarkerModel {
    pub fn new(name: &str, last_key: &str, updated_at: NaiveDateTime) -> Self {
        Self { name: name.to_string(), last_key: last_key.to_string(), updated_at }
    }
}
