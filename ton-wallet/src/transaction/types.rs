//! Common transaction types

use ed25519_dalek::SigningKey;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ton::{TonAddress, WalletV4R2};

/// Default number of transactions requested per page
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Pagination options for transaction history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    /// Maximum number of transactions to return
    pub limit: u32,
    /// Only return transactions older than this logical time
    pub before_lt: Option<u64>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_LIMIT,
            before_lt: None,
        }
    }
}

/// A transaction as returned by the indexer
///
/// Only the fields used for pagination are typed; everything else the
/// indexer sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction hash
    #[serde(default)]
    pub hash: String,
    /// Logical time
    #[serde(default, deserialize_with = "deserialize_u64")]
    pub lt: u64,
    /// Unix time
    #[serde(default)]
    pub utime: u64,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One page of transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub transactions: Vec<TransactionRecord>,
    /// True when the page is full, which suggests but does not guarantee
    /// that older transactions exist
    pub has_more: bool,
    /// Cursor for the next page
    pub next_before_lt: Option<u64>,
}

impl TransactionPage {
    pub fn new(transactions: Vec<TransactionRecord>, limit: u32) -> Self {
        let has_more = transactions.len() == limit as usize;
        let next_before_lt = transactions.last().map(|tx| tx.lt);
        Self {
            transactions,
            has_more,
            next_before_lt,
        }
    }
}

/// A wallet able to sign transfers
#[derive(Clone)]
pub struct SenderWallet {
    pub wallet: WalletV4R2,
    pub address: TonAddress,
    pub signing_key: SigningKey,
}

impl std::fmt::Debug for SenderWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderWallet")
            .field("address", &self.address.to_raw())
            .field("public_key", &hex::encode(self.wallet.public_key()))
            .finish_non_exhaustive()
    }
}

/// Result of broadcasting a transfer
#[derive(Debug, Clone)]
pub struct SentTransfer {
    pub wallet: SenderWallet,
    /// Wallet seqno before the transfer
    pub seqno: u32,
    /// Bounceable url-safe sender address
    pub sender_address: String,
}

/// A confirmed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    /// Transaction hash in the url-safe base64 alphabet
    pub url_hash: String,
    pub explorer_url: String,
}

/// Accepts an integer given either as a JSON number or as a decimal string
pub(crate) fn deserialize_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_amount(deserializer).and_then(|value| u64::try_from(value).map_err(D::Error::custom))
}

/// Accepts a non-negative amount given as a number, a decimal string or null
pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    parse_amount(value.as_ref().unwrap_or(&serde_json::Value::Null)).map_err(D::Error::custom)
}

/// Integer amount in smallest units from a JSON number or decimal string
pub(crate) fn parse_amount(value: &serde_json::Value) -> std::result::Result<u128, String> {
    match value {
        serde_json::Value::Null => Ok(0),
        serde_json::Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| format!("invalid amount {}", n)),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<u128>()
            .map_err(|e| format!("invalid amount {:?}: {}", s, e)),
        other => Err(format!("invalid amount {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepts_string_lt() {
        let record: TransactionRecord = serde_json::from_value(serde_json::json!({
            "hash": "abc",
            "lt": "47000000000003",
            "utime": 1700000000,
            "success": true
        }))
        .unwrap();
        assert_eq!(record.lt, 47_000_000_000_003);
        assert_eq!(record.extra.get("success"), Some(&serde_json::json!(true)));

        let record: TransactionRecord =
            serde_json::from_value(serde_json::json!({ "hash": "def", "lt": 12 })).unwrap();
        assert_eq!(record.lt, 12);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount(&serde_json::json!(1500)).unwrap(), 1500);
        assert_eq!(parse_amount(&serde_json::json!("2500000000")).unwrap(), 2_500_000_000);
        assert_eq!(parse_amount(&serde_json::Value::Null).unwrap(), 0);
        assert!(parse_amount(&serde_json::json!(-1)).is_err());
        assert!(parse_amount(&serde_json::json!("abc")).is_err());
    }

    #[test]
    fn test_page_cursor() {
        let records: Vec<TransactionRecord> = (1..=3u64)
            .map(|lt| serde_json::from_value(serde_json::json!({ "lt": lt * 10 })).unwrap())
            .collect();

        let page = TransactionPage::new(records.clone(), 3);
        assert!(page.has_more);
        assert_eq!(page.next_before_lt, Some(30));

        let page = TransactionPage::new(records, 5);
        assert!(!page.has_more);

        let empty = TransactionPage::new(Vec::new(), 5);
        assert_eq!(empty.next_before_lt, None);
        assert!(!empty.has_more);
    }
}
