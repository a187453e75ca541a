pub mod associate;
pub mod client;
pub mod collect;
pub mod db;
pub mod retry;
pub mod sources;
pub mod workers;

pub use client::Client;
pub use db::{new_db_pool, run_migrations};
pub use retry::RetryPolicy;
pub use workers::{IngestOptions, Ingestor, JobReport};
