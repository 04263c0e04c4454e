//! Endpoint configuration and the wallet RPC provider

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ton::TonAddress;

pub const DEFAULT_INDEXER_URL: &str = "https://toncenter.com/api/v2";
pub const DEFAULT_TOKEN_INDEXER_URL: &str = "https://tonapi.io/v2";
pub const DEFAULT_TESTNET_URL: &str = "https://testnet.toncenter.com/api/v2";
pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.toncenter.com/api/v2/jsonRPC";
pub const DEFAULT_EXPLORER_URL: &str = "https://testnet.tonviewer.com";
pub const DEFAULT_USDT_MASTER: &str = "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs";

/// Polling schedule used while waiting for a transfer to land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Pause before each seqno check
    pub interval: Duration,
    /// Number of seqno checks before giving up
    pub max_attempts: u32,
    /// Pause between the seqno change and the transaction lookup
    pub settle_delay: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// toncenter v2 mainnet API
    pub indexer_url: String,
    pub indexer_api_key: Option<String>,
    /// tonapi v2 API
    pub token_indexer_url: String,
    /// toncenter v2 testnet API
    pub testnet_url: String,
    /// toncenter testnet JSON-RPC endpoint used to read seqno and send messages
    pub testnet_rpc_url: String,
    pub testnet_api_key: Option<String>,
    pub explorer_url: String,
    /// USDT jetton master address
    pub usdt_master: String,
    /// HTTP timeout in seconds
    pub timeout: Option<u64>,
    pub confirmation: ConfirmationPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            indexer_url: DEFAULT_INDEXER_URL.to_string(),
            indexer_api_key: None,
            token_indexer_url: DEFAULT_TOKEN_INDEXER_URL.to_string(),
            testnet_url: DEFAULT_TESTNET_URL.to_string(),
            testnet_rpc_url: DEFAULT_TESTNET_RPC_URL.to_string(),
            testnet_api_key: None,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            usdt_master: DEFAULT_USDT_MASTER.to_string(),
            timeout: None,
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Read the configuration from `TON_*` environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            indexer_url: std::env::var("TON_INDEXER_URL").unwrap_or_else(|_| defaults.indexer_url),
            indexer_api_key: std::env::var("TON_INDEXER_API_KEY").ok(),
            token_indexer_url: std::env::var("TON_TOKEN_INDEXER_URL")
                .unwrap_or_else(|_| defaults.token_indexer_url),
            testnet_url: std::env::var("TON_TESTNET_URL").unwrap_or_else(|_| defaults.testnet_url),
            testnet_rpc_url: std::env::var("TON_TESTNET_RPC_URL")
                .unwrap_or_else(|_| defaults.testnet_rpc_url),
            testnet_api_key: std::env::var("TON_TESTNET_API_KEY").ok(),
            explorer_url: std::env::var("TON_EXPLORER_URL").unwrap_or_else(|_| defaults.explorer_url),
            usdt_master: std::env::var("TON_USDT_MASTER").unwrap_or_else(|_| defaults.usdt_master),
            timeout: std::env::var("TON_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            confirmation: defaults.confirmation,
        }
    }
}

/// Reads wallet state and broadcasts signed messages
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Current seqno of the wallet; 0 for a wallet that is not deployed
    async fn seqno(&self, address: &TonAddress) -> Result<u32>;

    /// Broadcast a serialized external message
    async fn send_boc(&self, boc: &[u8]) -> Result<()>;
}

/// toncenter JSON-RPC provider
pub struct ToncenterProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ToncenterProvider {
    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
        }
    }

    /// Send a JSON-RPC request and return its `result`
    async fn send_request(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!("POST {} {}", self.url, method);

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("X-API-Key", api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Failed to send request: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
            });
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse response: {}", e)))?;

        if response_json.get("ok").and_then(|ok| ok.as_bool()) == Some(false)
            || response_json.get("error").is_some_and(|e| !e.is_null())
        {
            let error = response_json
                .get("error")
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(Error::Provider(format!("JSON-RPC error: {}", error)));
        }

        response_json
            .get("result")
            .cloned()
            .ok_or_else(|| Error::Provider("No result in response".to_string()))
    }
}

#[async_trait]
impl WalletProvider for ToncenterProvider {
    async fn seqno(&self, address: &TonAddress) -> Result<u32> {
        let result = self
            .send_request(
                "runGetMethod",
                json!({
                    "address": address.to_friendly(true, true, false),
                    "method": "seqno",
                    "stack": [],
                }),
            )
            .await?;
        parse_seqno(&result)
    }

    async fn send_boc(&self, boc: &[u8]) -> Result<()> {
        self.send_request("sendBoc", json!({ "boc": STANDARD.encode(boc) }))
            .await?;
        Ok(())
    }
}

/// Read the seqno out of a `runGetMethod` result
///
/// A non-zero exit code means the contract is not deployed yet.
fn parse_seqno(result: &serde_json::Value) -> Result<u32> {
    let exit_code = result.get("exit_code").and_then(|c| c.as_i64()).unwrap_or(0);
    if exit_code != 0 {
        debug!("seqno get-method exited with {}, assuming an undeployed wallet", exit_code);
        return Ok(0);
    }

    let entry = match result
        .get("stack")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
    {
        Some(entry) => entry,
        None => return Ok(0),
    };

    // Stack entries look like ["num", "0x1a"]
    let value = entry
        .get(1)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Provider(format!("unexpected seqno stack entry: {}", entry)))?;
    let digits = value.trim_start_matches("0x");
    u32::from_str_radix(digits, 16)
        .map_err(|e| Error::Provider(format!("invalid seqno {}: {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seqno() {
        let result = json!({ "exit_code": 0, "stack": [["num", "0x1a"]] });
        assert_eq!(parse_seqno(&result).unwrap(), 26);

        let undeployed = json!({ "exit_code": -13, "stack": [] });
        assert_eq!(parse_seqno(&undeployed).unwrap(), 0);

        let garbage = json!({ "exit_code": 0, "stack": [["num", "zz"]] });
        assert!(parse_seqno(&garbage).is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.indexer_url, DEFAULT_INDEXER_URL);
        assert_eq!(config.confirmation.max_attempts, 30);
        assert_eq!(config.confirmation.interval, Duration::from_secs(2));
        assert!(config.indexer_api_key.is_none());
    }
}
