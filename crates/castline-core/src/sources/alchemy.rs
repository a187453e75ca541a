use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use castline_trait::{
    fetcher::{Fetcher, PageSource},
    http::HttpProvider,
};
use castline_types::{
    utils::{hex_to_i64, iso_to_epoch_millis, normalize_address},
    ApiRequest, Erc1155MetadataModel, EthTransactionModel, ExtractError, FetchError, Page,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{build_url, warpcast_users::split_page};
use crate::{
    collect::{collect_pages, fan_out, request_page, FanOutOptions},
    retry::RetryPolicy,
};

const SOURCE: &str = "alchemy";

pub const DEFAULT_ALCHEMY_URL: &str = "https://eth-mainnet.g.alchemy.com/v2";
pub const TRANSFER_CATEGORIES: [&str; 5] = ["erc721", "erc1155", "erc20", "specialnft", "external"];
const MAX_COUNT: &str = "0x3e8";
const UNKNOWN_CATEGORY: &str = "unknown";

/// Transfers to fetch for one address, starting at `from_block`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferQuery {
    pub address: String,
    pub from_block: i64,
}

impl TransferQuery {
    pub fn new(address: &str, from_block: i64) -> Self {
        Self { address: normalize_address(address), from_block }
    }
}

/// Transactions and their ERC-1155 metadata rows, ready to persist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferBatch {
    pub transactions: Vec<EthTransactionModel>,
    pub metadata: Vec<Erc1155MetadataModel>,
}

/// Build the `alchemy_getAssetTransfers` request body.
pub fn transfers_payload(from_block: i64, address: &str, page_key: Option<&str>) -> Value {
    let mut params = json!({
        "fromBlock": format!("0x{:x}", from_block),
        "toBlock": "latest",
        "toAddress": address,
        "category": TRANSFER_CATEGORIES,
        "withMetadata": true,
        "excludeZeroValue": true,
        "maxCount": MAX_COUNT,
    });
    if let Some(page_key) = page_key {
        params["pageKey"] = Value::String(page_key.to_string());
    }
    json!({
        "id": 1,
        "jsonrpc": "2.0",
        "method": "alchemy_getAssetTransfers",
        "params": [params],
    })
}

struct TransferPages<'a> {
    fetcher: &'a AssetTransfersFetcher,
    query: &'a TransferQuery,
}

#[async_trait]
impl<'a> PageSource for TransferPages<'a> {
    type Item = Value;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Value>, FetchError> {
        let request = self.fetcher.transfers_request(self.query, cursor)?;

        let body = request_page(self.fetcher.http.as_ref(), &self.fetcher.policy, &request).await?;
        if let Some(error) = body.get("error") {
            return Err(FetchError::Decode { url: request.label().to_string(), message: error.to_string() });
        }
        split_page(request.label(), body, "/result/transfers", "/result/pageKey")
    }
}

/// Collects asset transfers received by a set of addresses.
pub struct AssetTransfersFetcher {
    http: Arc<dyn HttpProvider>,
    policy: RetryPolicy,
    base_url: String,
    api_key: String,
    fan_out: FanOutOptions,
}

impl AssetTransfersFetcher {
    pub fn new(
        http: Arc<dyn HttpProvider>,
        policy: RetryPolicy,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        fan_out: FanOutOptions,
    ) -> Self {
        Self { http, policy, base_url: base_url.into(), api_key: api_key.into(), fan_out }
    }

    /// The api key is a path segment, so the request is labelled without it.
    fn transfers_request(&self, query: &TransferQuery, cursor: Option<&str>) -> Result<ApiRequest, FetchError> {
        let label = format!("{} transfers of {}", SOURCE, query.address);
        let url = build_url(&self.base_url, &self.api_key, &[])
            .map_err(|_| FetchError::InvalidRequest(format!("{}: invalid base url", label)))?;
        Ok(ApiRequest::post(url.as_str(), transfers_payload(query.from_block, &query.address, cursor))
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .labelled(label))
    }

    async fn fetch_address(&self, query: TransferQuery) -> Result<Option<Vec<Value>>, FetchError> {
        let pages = TransferPages { fetcher: self, query: &query };
        match collect_pages(&pages, Duration::ZERO).await {
            Ok(transfers) => Ok(Some(transfers)),
            Err(err @ FetchError::PageUnavailable { .. }) => {
                tracing::warn!("Skipping transfers of {}: {}", query.address, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl Fetcher for AssetTransfersFetcher {
    type Input = Vec<TransferQuery>;
    type Raw = Vec<Value>;
    type Output = TransferBatch;

    fn name(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_data(&self, queries: &Vec<TransferQuery>) -> Result<Vec<Value>, FetchError> {
        let results = fan_out(queries.clone(), self.fan_out, |query| self.fetch_address(query)).await?;
        let skipped = results.unavailable().len();
        let transfers: Vec<Value> =
            results.into_entries().into_iter().filter_map(|(_, transfers)| transfers).flatten().collect();
        tracing::info!(
            "Fetched {} transfers for {} addresses, {} skipped",
            transfers.len(),
            queries.len(),
            skipped
        );
        Ok(transfers)
    }

    fn get_models(&self, queries: &Vec<TransferQuery>, raw: Vec<Value>) -> TransferBatch {
        let requested: HashSet<&str> = queries.iter().map(|q| q.address.as_str()).collect();
        transfers_from_raw(&requested, &raw)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransfer {
    unique_id: String,
    hash: String,
    block_num: String,
    from: String,
    to: Option<String>,
    value: Option<f64>,
    erc721_token_id: Option<String>,
    token_id: Option<String>,
    asset: Option<String>,
    category: Option<String>,
    erc1155_metadata: Option<Vec<RawErc1155>>,
    metadata: RawTransferMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawErc1155 {
    token_id: String,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransferMetadata {
    block_timestamp: String,
}

/// The address a transfer is filed under: its receiver, or its sender when
/// there is no receiver.
pub fn owning_address(value: &Value) -> Option<String> {
    ["to", "from"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str).filter(|a| !a.is_empty()))
        .map(normalize_address)
}

pub fn extract_transfer(
    value: &Value,
    owner: &str,
) -> Result<(EthTransactionModel, Vec<Erc1155MetadataModel>), ExtractError> {
    let raw = RawTransfer::deserialize(value).map_err(|e| ExtractError::invalid(SOURCE, e))?;

    let metadata = raw
        .erc1155_metadata
        .unwrap_or_default()
        .into_iter()
        .map(|entry| Erc1155MetadataModel {
            eth_transaction_hash: raw.hash.clone(),
            token_id: entry.token_id,
            value: entry.value,
        })
        .collect();

    let transaction = EthTransactionModel {
        unique_id: raw.unique_id,
        address_external: owner.to_string(),
        timestamp: iso_to_epoch_millis(&raw.metadata.block_timestamp)?,
        block_num: hex_to_i64(&raw.block_num)?,
        from_address: normalize_address(&raw.from),
        to_address: raw.to.as_deref().map(normalize_address),
        value: raw.value,
        erc721_token_id: raw.erc721_token_id,
        token_id: raw.token_id,
        asset: raw.asset,
        category: raw.category.unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
        hash: raw.hash,
    };

    Ok((transaction, metadata))
}

/// Convert raw transfers, keeping only those owned by a requested address.
pub fn transfers_from_raw(requested: &HashSet<&str>, raw: &[Value]) -> TransferBatch {
    let mut batch = TransferBatch::default();
    let mut foreign = 0usize;
    let mut rejected = 0usize;

    for value in raw {
        let owner = match owning_address(value) {
            Some(owner) if requested.contains(owner.as_str()) => owner,
            _ => {
                foreign += 1;
                continue;
            }
        };
        match extract_transfer(value, &owner) {
            Ok((transaction, metadata)) => {
                batch.transactions.push(transaction);
                batch.metadata.extend(metadata);
            }
            Err(err) => {
                rejected += 1;
                tracing::warn!(source = SOURCE, "Rejected record: {}", err);
            }
        }
    }

    if foreign > 0 {
        tracing::debug!("Skipped {} transfers not owned by a requested address", foreign);
    }
    if rejected > 0 {
        tracing::warn!(source = SOURCE, "Rejected {} of {} transfers", rejected, raw.len());
    }

    batch
}
