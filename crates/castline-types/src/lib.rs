pub mod api;
pub mod errors;
pub mod models;
pub mod repository;
pub mod schema;
pub mod utils;

use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
pub use api::{ApiRequest, HttpMethod, Page};
pub use errors::{ExtractError, FetchError};
pub use models::*;

pub type DbPool = Pool<AsyncPgConnection>;

/// Name of the resumption marker advanced by the user/transaction associator.
pub const ASSOCIATION_MARKER: &str = "user_eth_association";
pub const DEFAULT_ASSOCIATION_BATCH_SIZE: i64 = 20_000;
