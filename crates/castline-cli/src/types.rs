use std::path::PathBuf;

use castline_core::{
    collect::fan_out::DEFAULT_CONCURRENCY,
    retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY},
    sources::{
        alchemy::DEFAULT_ALCHEMY_URL,
        ensdata::DEFAULT_ENSDATA_URL,
        searchcaster::DEFAULT_SEARCHCASTER_URL,
        warpcast_reactions::DEFAULT_REACTIONS_CHUNK,
        warpcast_users::{DEFAULT_PAGE_DELAY, DEFAULT_PAGE_LIMIT, DEFAULT_WARPCAST_URL},
    },
};
use castline_types::DEFAULT_ASSOCIATION_BATCH_SIZE;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "castline")]
#[command(about = "Ingests social profiles, reactions and on-chain transfers into Postgres", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Run(RunCommand),
}

#[derive(Args)]
pub struct RunCommand {
    #[command(subcommand)]
    pub mode: RunMode,
}

#[derive(Subcommand)]
pub enum RunMode {
    /// Fetch recent users and enrich them with profile search data
    Users(CliArgs),
    /// Fetch the reactions of the given casts
    Reactions(ReactionsArgs),
    /// Fetch ENS data of known external addresses
    Ens(CliArgs),
    /// Fetch asset transfers of known external addresses
    Transactions(CliArgs),
    /// Link users to the transactions they sent or received
    Associate(CliArgs),
    /// Remove duplicate user/transaction links
    Dedupe(CliArgs),
    /// Print the association marker
    Status(CliArgs),
}

#[derive(Args, Clone)]
pub struct CliArgs {
    /// Path to the config file
    #[arg(short, long, default_value = "config.toml")]
    pub config_path: String,
}

#[derive(Args, Clone)]
pub struct ReactionsArgs {
    #[command(flatten)]
    pub config: CliArgs,

    /// Hash of a cast to fetch reactions for, repeatable
    #[arg(long = "cast-hash", num_args = 1..)]
    pub cast_hashes: Vec<String>,

    /// File with one cast hash per line
    #[arg(long = "cast-file")]
    pub cast_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub warpcast: WarpcastConfig,
    #[serde(default)]
    pub searchcaster: SearchcasterConfig,
    #[serde(default)]
    pub ensdata: EnsdataConfig,
    #[serde(default)]
    pub alchemy: AlchemyConfig,
    #[serde(default)]
    pub associate: AssociateConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Overridden by `DATABASE_URL` when set.
    #[serde(default)]
    pub url: String,
    pub pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub concurrency: usize,
    pub deadline_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            concurrency: DEFAULT_CONCURRENCY,
            deadline_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WarpcastConfig {
    pub base_url: String,
    pub page_limit: u32,
    pub page_delay_ms: u64,
    pub reactions_chunk: usize,
}

impl Default for WarpcastConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WARPCAST_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            page_delay_ms: DEFAULT_PAGE_DELAY.as_millis() as u64,
            reactions_chunk: DEFAULT_REACTIONS_CHUNK,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchcasterConfig {
    pub base_url: String,
}

impl Default for SearchcasterConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_SEARCHCASTER_URL.to_string() }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EnsdataConfig {
    pub base_url: String,
}

impl Default for EnsdataConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_ENSDATA_URL.to_string() }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AlchemyConfig {
    pub base_url: String,
}

impl Default for AlchemyConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_ALCHEMY_URL.to_string() }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AssociateConfig {
    pub batch_size: i64,
}

impl Default for AssociateConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_ASSOCIATION_BATCH_SIZE }
    }
}

/// Credentials read from the environment.
#[derive(Debug, Default, Clone)]
pub struct Secrets {
    pub warpcast_api_key: Option<String>,
    pub alchemy_api_key: Option<String>,
    pub database_url: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        Self {
            warpcast_api_key: read("WARPCAST_API_KEY"),
            alchemy_api_key: read("ALCHEMY_API_KEY"),
            database_url: read("DATABASE_URL"),
        }
    }
}
