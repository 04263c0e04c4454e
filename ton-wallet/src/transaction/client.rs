//! Balance, address and history lookups against the TON indexers
//!
//! Every lookup comes in two flavours. The `fetch_*` / `try_*` methods
//! return the error. The `get_*` / `convert_*` adapters log a warning and
//! fall back to a safe default (zero, or the unconverted address), so a
//! caller cannot tell a failed lookup from an empty account.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ton::units::{from_nano, from_units, USDT_DECIMALS};
use crate::ton::TonAddress;
use super::provider::{ClientConfig, ToncenterProvider, WalletProvider};
use super::types::{deserialize_amount, parse_amount, PageOptions, TransactionPage, TransactionRecord, DEFAULT_PAGE_LIMIT};

/// toncenter v2 envelope
#[derive(Debug, Deserialize)]
pub(crate) struct ToncenterResponse<T> {
    pub result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AddressInformation {
    #[serde(default, deserialize_with = "deserialize_amount")]
    balance: u128,
}

#[derive(Debug, Deserialize)]
struct DetectedAddress {
    bounceable: Option<AddressForm>,
    non_bounceable: Option<AddressForm>,
}

#[derive(Debug, Deserialize)]
struct AddressForm {
    b64url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JettonBalances {
    #[serde(default)]
    balances: Vec<JettonBalance>,
}

#[derive(Debug, Deserialize)]
struct JettonBalance {
    #[serde(default)]
    balance: serde_json::Value,
    jetton: Option<JettonInfo>,
}

#[derive(Debug, Deserialize)]
struct JettonInfo {
    address: Option<String>,
    symbol: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountTransactions {
    #[serde(default)]
    transactions: Vec<TransactionRecord>,
}

/// Client for the TON indexers and the testnet wallet provider
pub struct TonClient {
    pub(crate) http: reqwest::Client,
    pub(crate) config: ClientConfig,
    pub(crate) provider: Arc<dyn WalletProvider>,
    /// raw address -> user-friendly form, never evicted
    friendly_cache: RwLock<HashMap<String, String>>,
}

impl TonClient {
    /// Create a client that talks to toncenter for wallet operations
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        let provider = ToncenterProvider::new(
            http.clone(),
            config.testnet_rpc_url.clone(),
            config.testnet_api_key.clone(),
        );
        Ok(Self::with_parts(http, config, Arc::new(provider)))
    }

    /// Create a client from `TON_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Create a client with a custom wallet provider
    pub fn with_provider(config: ClientConfig, provider: Arc<dyn WalletProvider>) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self::with_parts(http, config, provider))
    }

    fn with_parts(http: reqwest::Client, config: ClientConfig, provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            http,
            config,
            provider,
            friendly_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET a JSON document, failing on any non-2xx status
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        api_key: Option<&str>,
    ) -> Result<T> {
        debug!("GET {} {:?}", url, query);
        let mut request = self.http.get(url).query(query);
        if let Some(api_key) = api_key {
            request = request.header("X-API-Key", api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse response: {}", e)))
    }

    /// Mainnet TON balance
    pub async fn fetch_ton_balance(&self, address: &str) -> Result<f64> {
        let url = format!("{}/getAddressInformation", self.config.indexer_url);
        let response: ToncenterResponse<AddressInformation> = self
            .get_json(
                &url,
                &[("address", address.to_string())],
                self.config.indexer_api_key.as_deref(),
            )
            .await?;

        let nano = response.result.map(|info| info.balance).unwrap_or(0);
        Ok(from_nano(nano))
    }

    /// Mainnet TON balance, 0 on any failure
    pub async fn get_ton_balance(&self, address: &str) -> f64 {
        self.fetch_ton_balance(address).await.unwrap_or_else(|e| {
            warn!("TON balance error for {}: {}", address, e);
            0.0
        })
    }

    /// USDT jetton balance of `owner`; 0 when the account holds none
    pub async fn fetch_usdt_balance(&self, owner: &str) -> Result<f64> {
        let url = format!("{}/accounts/{}/jettons", self.config.token_indexer_url, owner);
        let response: JettonBalances = self.get_json(&url, &[], None).await?;

        let master = self.config.usdt_master.parse::<TonAddress>().ok();
        let usdt = response.balances.iter().find(|entry| {
            entry
                .jetton
                .as_ref()
                .map(|jetton| is_usdt(jetton, &self.config.usdt_master, master.as_ref()))
                .unwrap_or(false)
        });

        match usdt {
            Some(entry) => {
                let units = parse_amount(&entry.balance).map_err(Error::Provider)?;
                let balance = from_units(units, USDT_DECIMALS);
                debug!("USDT balance found for {}: {}", owner, balance);
                Ok(balance)
            }
            None => {
                debug!("No USDT balance found for {}", owner);
                Ok(0.0)
            }
        }
    }

    /// USDT jetton balance, 0 on any failure
    pub async fn get_usdt_balance(&self, owner: &str) -> f64 {
        self.fetch_usdt_balance(owner).await.unwrap_or_else(|e| {
            warn!("USDT balance error for {}: {}", owner, e);
            0.0
        })
    }

    /// User-friendly form of a raw address
    ///
    /// Addresses without a `:` are returned unchanged without a request.
    pub async fn try_convert_to_friendly(&self, raw: &str) -> Result<String> {
        if !TonAddress::is_raw(raw) {
            return Ok(raw.to_string());
        }
        if let Some(friendly) = self.cached_friendly(raw) {
            return Ok(friendly);
        }

        let url = format!("{}/detectAddress", self.config.indexer_url);
        let response: ToncenterResponse<DetectedAddress> = self
            .get_json(
                &url,
                &[("address", raw.to_string())],
                self.config.indexer_api_key.as_deref(),
            )
            .await?;

        let friendly = response
            .result
            .and_then(|detected| {
                non_empty_form(detected.bounceable).or_else(|| non_empty_form(detected.non_bounceable))
            })
            .ok_or_else(|| Error::Provider(format!("no user-friendly form returned for {}", raw)))?;

        if let Ok(mut cache) = self.friendly_cache.write() {
            cache.insert(raw.to_string(), friendly.clone());
        }
        Ok(friendly)
    }

    /// User-friendly form of a raw address, or the input on failure
    pub async fn convert_to_friendly(&self, raw: &str) -> String {
        self.try_convert_to_friendly(raw).await.unwrap_or_else(|e| {
            warn!("Address conversion failed for {}: {}", raw, e);
            raw.to_string()
        })
    }

    fn cached_friendly(&self, raw: &str) -> Option<String> {
        self.friendly_cache
            .read()
            .ok()
            .and_then(|cache| cache.get(raw).cloned())
    }

    /// One page of transaction history, newest first
    pub async fn fetch_transactions(&self, address: &str, options: PageOptions) -> Result<TransactionPage> {
        let limit = if options.limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            options.limit
        };

        let url = format!(
            "{}/blockchain/accounts/{}/transactions",
            self.config.token_indexer_url, address
        );
        let mut query = vec![("limit", limit.to_string())];
        if let Some(before_lt) = options.before_lt {
            query.push(("before_lt", before_lt.to_string()));
        }

        debug!("Fetching transactions for {}", address);
        let response: AccountTransactions = self.get_json(&url, &query, None).await?;
        Ok(TransactionPage::new(response.transactions, limit))
    }

    /// Testnet TON balance
    pub async fn fetch_testnet_balance(&self, address: &str) -> Result<f64> {
        let url = format!("{}/getAddressBalance", self.config.testnet_url);
        let response: ToncenterResponse<serde_json::Value> = self
            .get_json(
                &url,
                &[("address", address.to_string())],
                self.config.testnet_api_key.as_deref(),
            )
            .await?;

        let nano = parse_amount(response.result.as_ref().unwrap_or(&serde_json::Value::Null))
            .map_err(Error::Provider)?;
        Ok(from_nano(nano))
    }

    /// Testnet TON balance, 0 on any failure
    pub async fn get_testnet_balance(&self, address: &str) -> f64 {
        self.fetch_testnet_balance(address).await.unwrap_or_else(|e| {
            warn!("Testnet balance error for {}: {}", address, e);
            0.0
        })
    }
}

fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(Duration::from_secs(timeout));
    }
    builder
        .build()
        .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))
}

fn non_empty_form(form: Option<AddressForm>) -> Option<String> {
    form.and_then(|f| f.b64url).filter(|s| !s.is_empty())
}

/// Whether a jetton is USDT: by master address (in any spelling), symbol or name
fn is_usdt(jetton: &JettonInfo, master: &str, master_address: Option<&TonAddress>) -> bool {
    let address_matches = jetton.address.as_deref().is_some_and(|address| {
        address == master
            || match (address.parse::<TonAddress>(), master_address) {
                (Ok(parsed), Some(master)) => parsed == *master,
                _ => false,
            }
    });

    address_matches
        || jetton.symbol.as_deref() == Some("USDT")
        || jetton.name.as_deref().is_some_and(|name| name.contains("Tether"))
}
