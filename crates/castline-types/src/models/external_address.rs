use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq, Serialize, Deserialize,
)]
#[diesel(table_name = crate::schema::external_addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct ExternalAddressModel {
    pub address: String,
    pub ens: Option<String>,
    pub url: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub email: Option<String>,
    pub discord: Option<String>,
}
