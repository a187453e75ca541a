use diesel::prelude::*;

/// A link between a user and one of the transactions they sent or received.
#[derive(Insertable, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[diesel(table_name = crate::schema::user_eth_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewAssociation {
    pub user_fid: i64,
    pub eth_transaction_unique_id: String,
}

impl NewAssociation {
    pub fn new(user_fid: i64, eth_transaction_unique_id: impl Into<String>) -> Self {
        Self { user_fid, eth_transaction_unique_id: eth_transaction_unique_id.into() }
    }
}
