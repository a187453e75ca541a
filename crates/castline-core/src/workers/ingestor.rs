use std::{fmt, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use castline_trait::{fetcher::Fetcher, http::HttpProvider};
use castline_types::{
    repository::{
        get_marker_record, insert_reactions, insert_transactions, latest_blocks_for_addresses,
        list_external_addresses, update_user_enrichment, upsert_external_addresses, upsert_locations,
        upsert_users,
    },
    DbPool, SyncMarkerModel, ASSOCIATION_MARKER, DEFAULT_ASSOCIATION_BATCH_SIZE,
};

use crate::{
    associate::{clean_duplicate_associations, AssociationRunner, PgAssociationStore, RunSummary},
    collect::FanOutOptions,
    retry::RetryPolicy,
    sources::{
        alchemy::{AssetTransfersFetcher, TransferQuery, DEFAULT_ALCHEMY_URL},
        ensdata::{EnsDataFetcher, DEFAULT_ENSDATA_URL},
        searchcaster::{apply_enrichments, ProfileSearchFetcher, DEFAULT_SEARCHCASTER_URL},
        warpcast_reactions::{CastReactionsConfig, CastReactionsFetcher, DEFAULT_REACTIONS_CHUNK},
        warpcast_users::{
            RecentUsersConfig, RecentUsersFetcher, DEFAULT_PAGE_DELAY, DEFAULT_PAGE_LIMIT,
            DEFAULT_WARPCAST_URL,
        },
    },
};

/// Endpoints, credentials and tuning of the ingestion jobs.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub warpcast_url: String,
    pub warpcast_api_key: Option<String>,
    pub page_limit: u32,
    pub page_delay: Duration,
    pub reactions_chunk: usize,
    pub searchcaster_url: String,
    pub ensdata_url: String,
    pub alchemy_url: String,
    pub alchemy_api_key: Option<String>,
    pub fan_out: FanOutOptions,
    pub association_batch_size: i64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            warpcast_url: DEFAULT_WARPCAST_URL.to_string(),
            warpcast_api_key: None,
            page_limit: DEFAULT_PAGE_LIMIT,
            page_delay: DEFAULT_PAGE_DELAY,
            reactions_chunk: DEFAULT_REACTIONS_CHUNK,
            searchcaster_url: DEFAULT_SEARCHCASTER_URL.to_string(),
            ensdata_url: DEFAULT_ENSDATA_URL.to_string(),
            alchemy_url: DEFAULT_ALCHEMY_URL.to_string(),
            alchemy_api_key: None,
            fan_out: FanOutOptions::default(),
            association_batch_size: DEFAULT_ASSOCIATION_BATCH_SIZE,
        }
    }
}

impl IngestOptions {
    fn warpcast_api_key(&self) -> Result<String> {
        self.warpcast_api_key.clone().context("WARPCAST_API_KEY is not set")
    }

    fn alchemy_api_key(&self) -> Result<String> {
        self.alchemy_api_key.clone().context("ALCHEMY_API_KEY is not set")
    }
}

/// Records fetched and stored by one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: &'static str,
    pub fetched: usize,
    pub stored: usize,
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: fetched {}, stored {}", self.job, self.fetched, self.stored)
    }
}

/// Runs the ingestion and association jobs against one database.
pub struct Ingestor {
    pub db_pool: Arc<DbPool>,
    pub http: Arc<dyn HttpProvider>,
    pub policy: RetryPolicy,
    pub options: IngestOptions,
}

impl Ingestor {
    pub fn new(
        db_pool: Arc<DbPool>,
        http: Arc<dyn HttpProvider>,
        policy: RetryPolicy,
        options: IngestOptions,
    ) -> Self {
        Self { db_pool, http, policy, options }
    }

    /// Fetch recent users, store them with their locations, then enrich them
    /// with addresses and registration times from the profile search.
    pub async fn sync_users(&self) -> Result<JobReport> {
        let users_fetcher = RecentUsersFetcher::new(
            self.http.clone(),
            self.policy,
            RecentUsersConfig {
                base_url: self.options.warpcast_url.clone(),
                api_key: self.options.warpcast_api_key()?,
                page_limit: self.options.page_limit,
                page_delay: self.options.page_delay,
            },
        );

        let raw = users_fetcher.fetch_data(&()).await.context("Failed to fetch recent users")?;
        let batch = users_fetcher.get_models(&(), raw);

        let locations = upsert_locations(self.db_pool.clone(), &batch.locations).await?;
        let stored = upsert_users(self.db_pool.clone(), &batch.users).await?;
        tracing::info!("Stored {} users and {} locations", stored, locations);

        let search = ProfileSearchFetcher::new(
            self.http.clone(),
            self.policy,
            self.options.searchcaster_url.clone(),
            self.options.fan_out,
        );
        let usernames: Vec<String> = batch.users.iter().map(|user| user.username.clone()).collect();
        let profiles = search.fetch_data(&usernames).await.context("Failed to fetch profiles")?;
        let unavailable = profiles.unavailable().len();
        let enrichments = search.get_models(&usernames, profiles);

        let enriched = apply_enrichments(&batch.users, &enrichments);
        let updated = update_user_enrichment(self.db_pool.clone(), &enriched).await?;
        tracing::info!("Enriched {} users, {} profiles unavailable", updated, unavailable);

        Ok(JobReport { job: "users", fetched: batch.users.len(), stored })
    }

    pub async fn sync_reactions(&self, cast_hashes: Vec<String>) -> Result<JobReport> {
        let fetcher = CastReactionsFetcher::new(
            self.http.clone(),
            self.policy,
            CastReactionsConfig {
                base_url: self.options.warpcast_url.clone(),
                api_key: self.options.warpcast_api_key()?,
                chunk_size: self.options.reactions_chunk,
            },
            self.options.fan_out,
        );

        let raw = fetcher.fetch_data(&cast_hashes).await.context("Failed to fetch cast reactions")?;
        let reactions = fetcher.get_models(&cast_hashes, raw);
        let stored = insert_reactions(self.db_pool.clone(), &reactions).await?;

        Ok(JobReport { job: "reactions", fetched: reactions.len(), stored })
    }

    /// Look up ENS data for every known external address.
    pub async fn sync_ens(&self) -> Result<JobReport> {
        let addresses = list_external_addresses(self.db_pool.clone()).await?;
        tracing::info!("Looking up ENS data for {} addresses", addresses.len());

        let fetcher = EnsDataFetcher::new(
            self.http.clone(),
            self.policy,
            self.options.ensdata_url.clone(),
            self.options.fan_out,
        );
        let raw = fetcher.fetch_data(&addresses).await.context("Failed to fetch ENS data")?;
        let records = fetcher.get_models(&addresses, raw);
        let stored = upsert_external_addresses(self.db_pool.clone(), &records).await?;

        Ok(JobReport { job: "ens", fetched: records.len(), stored })
    }

    /// Fetch transfers received by every known external address, starting at
    /// the latest block already stored for it.
    pub async fn sync_transactions(&self) -> Result<JobReport> {
        let addresses = list_external_addresses(self.db_pool.clone()).await?;
        let latest = latest_blocks_for_addresses(self.db_pool.clone(), &addresses).await?;
        let queries: Vec<TransferQuery> = addresses
            .iter()
            .map(|address| TransferQuery::new(address, latest.get(address).copied().unwrap_or(0)))
            .collect();
        tracing::info!(
            "Fetching transfers for {} addresses, {} with stored history",
            queries.len(),
            latest.len()
        );

        let fetcher = AssetTransfersFetcher::new(
            self.http.clone(),
            self.policy,
            self.options.alchemy_url.clone(),
            self.options.alchemy_api_key()?,
            self.options.fan_out,
        );
        let raw = fetcher.fetch_data(&queries).await.context("Failed to fetch asset transfers")?;
        let batch = fetcher.get_models(&queries, raw);
        let stored = insert_transactions(self.db_pool.clone(), &batch.transactions, &batch.metadata).await?;

        Ok(JobReport { job: "transactions", fetched: batch.transactions.len(), stored })
    }

    pub async fn associate(&self) -> Result<RunSummary> {
        let store = PgAssociationStore::new(self.db_pool.clone());
        AssociationRunner::new(store).with_batch_size(self.options.association_batch_size).run().await
    }

    pub async fn dedupe(&self) -> Result<usize> {
        clean_duplicate_associations(&PgAssociationStore::new(self.db_pool.clone())).await
    }

    /// Last transaction unique id committed by the associator, and when.
    pub async fn association_marker(&self) -> Result<Option<SyncMarkerModel>> {
        get_marker_record(self.db_pool.clone(), ASSOCIATION_MARKER).await
    }
}
