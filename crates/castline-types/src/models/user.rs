use diesel::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserModel {
    pub fid: i64,
    pub username: String,
    pub display_name: String,
    pub pfp_url: String,
    pub bio_text: String,
    pub following_count: i64,
    pub follower_count: i64,
    pub location_id: Option<String>,
    pub verified: i32,
    pub farcaster_address: Option<String>,
    pub external_address: Option<String>,
    pub registered_at: Option<i64>,
}

impl UserModel {
    /// Copies enrichment data onto the user. Profile fields are left untouched.
    pub fn apply_enrichment(&mut self, enrichment: &UserEnrichment) {
        self.farcaster_address = Some(enrichment.farcaster_address.clone());
        self.external_address = enrichment.external_address.clone();
        self.registered_at = Some(enrichment.registered_at);
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::locations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LocationModel {
    pub id: String,
    pub description: String,
}

/// Address and registration data resolved for a user by the profile search source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEnrichment {
    pub fid: i64,
    pub farcaster_address: String,
    pub external_address: Option<String>,
    pub registered_at: i64,
}
