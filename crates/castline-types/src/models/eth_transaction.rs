use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::eth_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EthTransactionModel {
    pub unique_id: String,
    pub hash: String,
    pub address_external: String,
    /// Block time in epoch milliseconds.
    pub timestamp: i64,
    pub block_num: i64,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: Option<f64>,
    pub erc721_token_id: Option<String>,
    pub token_id: Option<String>,
    pub asset: Option<String>,
    pub category: String,
}

#[derive(Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::erc1155_metadata)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Erc1155MetadataModel {
    pub eth_transaction_hash: String,
    pub token_id: String,
    pub value: String,
}
