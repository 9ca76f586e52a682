use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde_json::{json, Value};

use crate::types::{Address, WalletBalances};
use crate::watch::status::FetchError;

/// NPT token contract on Base mainnet.
pub const NPT_CONTRACT: &str = "0xB8c2CE84F831175136cebBFD48CE4BAb9c7a6424";

/// `balanceOf(address)` selector.
const BALANCE_OF_SELECTOR: &str = "0x70a08231";

const WEI_PER_ETHER: f64 = 1e18;

/// Reads wallet balances straight from the chain, bypassing the Netrum API.
///
/// Two JSON-RPC calls (`eth_getBalance`, `eth_call` against the token
/// contract) plus one spot-price lookup make up a balances wave.
#[derive(Clone)]
pub struct RpcClient {
    http: Client,
    rpc_url: String,
    price_url: String,
}

impl RpcClient {
    pub fn new(rpc_url: String, price_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build RPC client")?;
        Ok(Self {
            http,
            rpc_url,
            price_url,
        })
    }

    pub fn wallet_balances(&self, address: &Address) -> Result<WalletBalances, FetchError> {
        let eth = self.eth_balance(address)?;
        let npt = self.token_balance(address)?;
        let usd = self.eth_usd_price().map(|price| eth * price).unwrap_or(0.0);
        Ok(WalletBalances { eth, npt, usd })
    }

    pub fn eth_balance(&self, address: &Address) -> Result<f64, FetchError> {
        let result = self.rpc_call(
            "eth_getBalance",
            json!([address.as_str(), "latest"]),
        )?;
        parse_hex_quantity(&result)
    }

    pub fn token_balance(&self, address: &Address) -> Result<f64, FetchError> {
        let result = self.rpc_call(
            "eth_call",
            json!([
                {"to": NPT_CONTRACT, "data": balance_of_calldata(address)},
                "latest"
            ]),
        )?;
        parse_hex_quantity(&result)
    }

    /// Spot ETH/USD price. Failures here degrade the USD figure to zero
    /// rather than failing the whole balances wave.
    fn eth_usd_price(&self) -> Option<f64> {
        let value: Value = self
            .http
            .get(&self.price_url)
            .send()
            .ok()?
            .json()
            .ok()?;
        value
            .get("ethereum")
            .and_then(|eth| eth.get("usd"))
            .and_then(Value::as_f64)
    }

    fn rpc_call(&self, method: &str, params: Value) -> Result<Value, FetchError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .map_err(classify_transport)?;

        let value: Value = resp.json().map_err(|_| {
            FetchError::InvalidResponseBody("RPC response is not JSON".to_string())
        })?;

        if let Some(err) = value.get("error").filter(|err| !err.is_null()) {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("RPC call rejected")
                .to_string();
            return Err(FetchError::RemoteRejected(message));
        }

        // A missing result reads as a zero balance, same as the node
        // returning "0x0".
        Ok(value.get("result").cloned().unwrap_or(json!("0x0")))
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::NetworkUnreachable(err.to_string())
    }
}

/// ABI-encoded `balanceOf(address)` call: 4-byte selector plus the address
/// left-padded to a 32-byte word.
pub fn balance_of_calldata(address: &Address) -> String {
    format!("{BALANCE_OF_SELECTOR}{:0>64}", address.hex_digits())
}

/// Decode a hex quantity (`"0x..."`) into whole tokens at 18 decimals.
pub fn parse_hex_quantity(value: &Value) -> Result<f64, FetchError> {
    let text = value.as_str().ok_or_else(|| {
        FetchError::InvalidResponseBody("RPC result is not a hex string".to_string())
    })?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    if digits.is_empty() {
        return Ok(0.0);
    }
    let wei = u128::from_str_radix(digits, 16).map_err(|_| {
        FetchError::InvalidResponseBody(format!("bad hex quantity: {text}"))
    })?;
    Ok(wei as f64 / WEI_PER_ETHER)
}
