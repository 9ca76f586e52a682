use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;

use crate::types::{
    ClaimStatus, LiteStatsResponse, MiningCooldown, MiningDebug, NodeDetail, NodeDirectoryEntry,
    NodeMetricsReport, Requirements, TaskStats,
};
use crate::watch::cache::SharedStore;
use crate::watch::status::FetchError;

pub const REQUIREMENTS_TTL: Duration = Duration::from_secs(300);

/// Blocking client for the Netrum REST API.
///
/// Every GET is funneled through the shared [`ResponseStore`]: most paths sit
/// behind the per-key cooldown guard, the hardware-requirements path behind
/// the TTL memo. The client is cheap to clone; clones share the store.
///
/// [`ResponseStore`]: crate::watch::cache::ResponseStore
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: SharedStore,
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Duration, store: SharedStore) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            store,
        })
    }

    pub fn lite_stats(&self) -> Result<LiteStatsResponse, FetchError> {
        let value = self.get_guarded("/lite/nodes/stats")?;
        decode(value, "lite stats")
    }

    pub fn active_nodes(&self) -> Result<Vec<NodeDirectoryEntry>, FetchError> {
        let value = self.get_guarded("/lite/nodes/active")?;
        let rows = match value {
            Value::Array(rows) => rows,
            Value::Object(mut map) => match map.remove("nodes").or_else(|| map.remove("data")) {
                Some(Value::Array(rows)) => rows,
                _ => {
                    return Err(FetchError::InvalidResponseBody(
                        "directory listing is not an array".to_string(),
                    ))
                }
            },
            _ => {
                return Err(FetchError::InvalidResponseBody(
                    "directory listing is not an array".to_string(),
                ))
            }
        };

        // Rows missing a node id are unusable as join entries; skip them
        // rather than failing the whole directory.
        Ok(rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect())
    }

    pub fn node_detail(&self, node_id: &str) -> Result<NodeDetail, FetchError> {
        let value = self.get_guarded(&format!("/lite/nodes/id/{node_id}"))?;
        decode(value, "node detail")
    }

    pub fn mining_cooldown(&self, node_id: &str) -> Result<MiningCooldown, FetchError> {
        let value = self.get_guarded(&format!("/mining/cooldown/{node_id}"))?;
        decode(value, "mining cooldown")
    }

    pub fn claim_status(&self, address: &str) -> Result<ClaimStatus, FetchError> {
        let value = self.get_guarded(&format!("/claim/status/{address}"))?;
        decode(value, "claim status")
    }

    /// The node identity recorded with the wallet's most recent claim, if any.
    pub fn claim_history_node_id(&self, address: &str) -> Result<Option<String>, FetchError> {
        let value = self.get_guarded(&format!("/claim/history/{address}"))?;
        Ok(value
            .get("lastClaim")
            .and_then(|claim| claim.get("nodeId"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub fn check_cooldown(&self, node_id: &str) -> Result<NodeMetricsReport, FetchError> {
        let value = self.get_guarded(&format!("/metrics/check-cooldown/{node_id}"))?;
        decode(value, "metrics report")
    }

    pub fn task_stats(&self, node_id: &str) -> Result<TaskStats, FetchError> {
        let value = self.get_guarded(&format!("/polling/node-stats/{node_id}"))?;
        decode(value, "task stats")
    }

    pub fn mining_debug_contract(&self, address: &str) -> Result<MiningDebug, FetchError> {
        let value = self.get_guarded(&format!("/mining/debug/contract/{address}"))?;
        decode(value, "mining debug")
    }

    pub fn requirements(&self) -> Result<Requirements, FetchError> {
        let value = self.get_cached("/metrics/requirements", REQUIREMENTS_TTL)?;
        let payload = value.get("requirements").cloned().unwrap_or(value);
        decode(payload, "hardware requirements")
    }

    /// Cooldown-guarded GET. A key inside its window returns the cooldown
    /// sentinel without touching the network; only a successful response
    /// stamps the window.
    fn get_guarded(&self, path: &str) -> Result<Value, FetchError> {
        let now = Instant::now();
        if let Ok(store) = self.store.lock() {
            if let Some(remaining) = store.cooldowns.check(path, now) {
                return Err(FetchError::Cooldown {
                    next_allowed_in_ms: remaining.as_millis() as u64,
                });
            }
        }

        let value = self.fetch_json(path)?;

        if let Ok(mut store) = self.store.lock() {
            store.cooldowns.stamp(path, Instant::now());
        }
        Ok(value)
    }

    /// TTL-memoized GET for low-churn, expensive lookups. A fresh entry is
    /// served without network I/O; past the window the entry is refetched and
    /// overwritten whole.
    fn get_cached(&self, path: &str, window: Duration) -> Result<Value, FetchError> {
        let now = Instant::now();
        if let Ok(store) = self.store.lock() {
            if let Some(hit) = store.ttl.get(path, window, now) {
                return Ok(hit);
            }
        }

        let value = self.fetch_json(path)?;

        if let Ok(mut store) = self.store.lock() {
            store.ttl.insert(path, value.clone(), Instant::now());
        }
        Ok(value)
    }

    fn fetch_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(url).send().map_err(classify_transport)?;

        let status = resp.status();
        let body = resp.text().map_err(classify_transport)?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|_| FetchError::InvalidResponseBody("invalid JSON response".to_string()))?;

        if !status.is_success() || body_signals_failure(&value) {
            let message = value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("API {}", status.as_u16()));
            return Err(FetchError::RemoteRejected(message));
        }

        Ok(value)
    }
}

fn body_signals_failure(value: &Value) -> bool {
    if value.get("error").is_some_and(|err| !err.is_null()) {
        return true;
    }
    value.get("success") == Some(&Value::Bool(false))
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        // The reqwest display chain includes the URL; keep only the terse
        // root-cause description for the inline card message.
        let detail = source_tail(&err).unwrap_or_else(|| "transport failure".to_string());
        FetchError::NetworkUnreachable(detail)
    }
}

fn source_tail(err: &reqwest::Error) -> Option<String> {
    let mut source = std::error::Error::source(err)?;
    while let Some(next) = source.source() {
        source = next;
    }
    Some(source.to_string())
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &str) -> Result<T, FetchError> {
    serde_json::from_value(value)
        .map_err(|err| FetchError::InvalidResponseBody(format!("{what}: {err}")))
}
