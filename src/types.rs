use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// A 20-byte wallet address in `0x` + 40 hex characters form.
///
/// Parsing normalizes the hex digits to lowercase so directory lookups and
/// cache keys compare consistently regardless of how the user typed it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.len() != 42 {
            return None;
        }
        let digits = trimmed.strip_prefix("0x")?;
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 40 hex digits without the `0x` prefix, as used in contract calldata.
    pub fn hex_digits(&self) -> &str {
        &self.0[2..]
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiteStatsResponse {
    pub stats: LiteStatsCounters,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiteStatsCounters {
    #[serde(rename = "totalNodes", default)]
    pub total_nodes: u64,
    #[serde(rename = "activeNodes", default)]
    pub active_nodes: u64,
    #[serde(rename = "inactiveNodes", default)]
    pub inactive_nodes: u64,
    #[serde(rename = "totalTasks", default)]
    pub total_tasks: u64,
}

/// One row of the node directory, the join table between wallet addresses and
/// node identities. Upstream field naming drifts between deployments, hence
/// the aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeDirectoryEntry {
    #[serde(rename = "nodeId", alias = "id")]
    pub node_id: String,
    #[serde(
        rename = "nodeAddress",
        alias = "walletAddress",
        alias = "wallet",
        alias = "address",
        default
    )]
    pub address: Option<String>,
    #[serde(rename = "nodeType", alias = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeDetail {
    #[serde(rename = "nodeType", alias = "type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeMetricsReport {
    #[serde(rename = "lastSuccessfulSync", default)]
    pub last_successful_sync: Option<LastSync>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LastSync {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub details: Option<SyncDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncDetails {
    #[serde(rename = "syncStatus", default)]
    pub sync_status: Option<String>,
    #[serde(rename = "meetsRequirements", default)]
    pub meets_requirements: Option<bool>,
    #[serde(default)]
    pub metrics: Option<HardwareMetrics>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HardwareMetrics {
    #[serde(default)]
    pub cpu: Option<u64>,
    #[serde(rename = "ramGB", default)]
    pub ram_gb: Option<f64>,
    #[serde(rename = "diskGB", default)]
    pub disk_gb: Option<f64>,
    #[serde(rename = "speedMbps", default)]
    pub speed_mbps: Option<f64>,
    #[serde(rename = "uploadSpeedMbps", default)]
    pub upload_speed_mbps: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiningCooldown {
    #[serde(rename = "canStartMining", default)]
    pub can_start_mining: Option<bool>,
    #[serde(rename = "lastMiningStart", default)]
    pub last_mining_start: Option<String>,
    #[serde(rename = "minedTokens", default)]
    pub mined_tokens: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimStatus {
    #[serde(rename = "nodeAddress", default)]
    pub node_address: Option<String>,
    #[serde(rename = "lastClaimTime", default)]
    pub last_claim_time: Option<String>,
    #[serde(rename = "canClaim", default)]
    pub can_claim: Option<bool>,
    #[serde(rename = "minedTokensFormatted", default)]
    pub mined_tokens_formatted: Option<Value>,
    #[serde(default)]
    pub requirements: Option<ClaimRequirements>,
    #[serde(rename = "miningSession", default)]
    pub mining_session: Option<MiningSession>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClaimRequirements {
    #[serde(rename = "miningDuration", default)]
    pub mining_duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiningSession {
    #[serde(rename = "formattedRemainingTime", default)]
    pub formatted_remaining_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiningDebug {
    #[serde(default)]
    pub contract: Option<MiningDebugContract>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiningDebugContract {
    #[serde(rename = "miningInfo", default)]
    pub mining_info: Option<MiningInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MiningInfo {
    #[serde(rename = "speedPerSec", default)]
    pub speed_per_sec: Option<Value>,
    #[serde(rename = "percentCompleteNumber", default)]
    pub percent_complete_number: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TaskStats {
    #[serde(rename = "lastPolledAt", default)]
    pub last_polled_at: Option<String>,
    #[serde(rename = "lastTaskCompleted", default)]
    pub last_task_completed: Option<String>,
    #[serde(rename = "lastTaskAssigned", default)]
    pub last_task_assigned: Option<String>,
    #[serde(rename = "ttsPowerStatus", default)]
    pub tts_power_status: Option<String>,
    #[serde(rename = "availableRam", default)]
    pub available_ram: Option<f64>,
    #[serde(rename = "taskCount", default)]
    pub task_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Requirements {
    #[serde(rename = "CORES", default)]
    pub cores: Option<u64>,
    #[serde(rename = "RAM", default)]
    pub ram_gb: Option<f64>,
    #[serde(rename = "STORAGE", default)]
    pub storage_gb: Option<f64>,
    #[serde(rename = "DOWNLOAD_SPEED", default)]
    pub download_mbps: Option<f64>,
    #[serde(rename = "UPLOAD_SPEED", default)]
    pub upload_mbps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalletBalances {
    pub eth: f64,
    pub npt: f64,
    pub usd: f64,
}

/// Assembled metrics card: the node's last hardware report merged with the
/// directory detail for the same identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStatusCard {
    pub node_type: Option<String>,
    pub status: Option<String>,
    pub sync_status: Option<String>,
    pub meets_requirements: Option<bool>,
    pub last_sync_at: Option<String>,
    pub cpu_cores: Option<u64>,
    pub ram_gb: Option<f64>,
    pub disk_gb: Option<f64>,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
}

/// Assembled mining card: cooldown, claim eligibility and on-chain session
/// progress folded into one view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningOverview {
    pub can_start_mining: Option<bool>,
    pub last_mining_start: Option<String>,
    pub mined_tokens: Option<f64>,
    pub can_claim: Option<bool>,
    pub last_claim_time: Option<String>,
    pub mining_duration: Option<String>,
    pub remaining_time: Option<String>,
    pub speed_per_sec: Option<f64>,
    pub percent_complete: Option<f64>,
}

/// Numeric fields the upstream API serializes inconsistently as either a JSON
/// number or a decimal string.
pub fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_parse_accepts_canonical_form() {
        let addr = Address::parse("0xABCDEF0123456789ABCDEF0123456789ABCDEF01")
            .expect("valid address should parse");
        assert_eq!(addr.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(addr.hex_digits().len(), 40);
        assert!(addr.matches("0xABCDEF0123456789ABCDEF0123456789ABCDEF01"));
    }

    #[test]
    fn address_parse_rejects_malformed_input() {
        assert!(Address::parse("0x123").is_none());
        assert!(Address::parse("").is_none());
        assert!(Address::parse("abcdef0123456789abcdef0123456789abcdef0123").is_none());
        assert!(Address::parse("0xZZCDEF0123456789ABCDEF0123456789ABCDEF01").is_none());
        // 41 hex digits
        assert!(Address::parse("0xabcdef0123456789abcdef0123456789abcdef012").is_none());
    }

    #[test]
    fn directory_entry_accepts_field_aliases() {
        let entry: NodeDirectoryEntry = serde_json::from_value(json!({
            "id": "node-7",
            "walletAddress": "0xaa00000000000000000000000000000000000001",
            "type": "lite",
            "status": "active"
        }))
        .expect("aliased entry should deserialize");
        assert_eq!(entry.node_id, "node-7");
        assert_eq!(
            entry.address.as_deref(),
            Some("0xaa00000000000000000000000000000000000001")
        );
    }

    #[test]
    fn metrics_report_tolerates_missing_sections() {
        let report: NodeMetricsReport =
            serde_json::from_value(json!({})).expect("empty report should deserialize");
        assert!(report.last_successful_sync.is_none());

        let report: NodeMetricsReport = serde_json::from_value(json!({
            "lastSuccessfulSync": {
                "timestamp": "2026-01-01T00:00:00Z",
                "details": {"syncStatus": "Active", "metrics": {"cpu": 8, "ramGB": 16.0}}
            }
        }))
        .expect("partial report should deserialize");
        let sync = report.last_successful_sync.expect("sync should be present");
        let details = sync.details.expect("details should be present");
        assert_eq!(details.sync_status.as_deref(), Some("Active"));
        assert_eq!(
            details.metrics.expect("metrics should be present").cpu,
            Some(8)
        );
    }

    #[test]
    fn lenient_f64_handles_numbers_and_strings() {
        assert_eq!(lenient_f64(Some(&json!(1.5))), Some(1.5));
        assert_eq!(lenient_f64(Some(&json!("42.25"))), Some(42.25));
        assert_eq!(lenient_f64(Some(&json!(null))), None);
        assert_eq!(lenient_f64(None), None);
    }

    #[test]
    fn requirements_use_upstream_screaming_keys() {
        let req: Requirements = serde_json::from_value(json!({
            "CORES": 4, "RAM": 8.0, "STORAGE": 100.0,
            "DOWNLOAD_SPEED": 50.0, "UPLOAD_SPEED": 25.0
        }))
        .expect("requirements should deserialize");
        assert_eq!(req.cores, Some(4));
        assert_eq!(req.download_mbps, Some(50.0));
    }
}
