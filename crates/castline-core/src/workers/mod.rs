pub mod ingestor;

pub use ingestor::{IngestOptions, Ingestor, JobReport};
