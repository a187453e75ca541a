use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::reactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReactionModel {
    pub hash: String,
    pub reaction_type: String,
    pub timestamp: i64,
    pub target_hash: String,
    pub author_fid: i64,
}
