//! Signing, broadcasting and confirming Toncoin transfers

use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::crypto::keys::ton::signing_key_from_hex;
use crate::error::{Error, Result};
use crate::ton::{serialize_boc, to_nano, TonAddress, Transfer, WalletV4R2};
use super::client::{TonClient, ToncenterResponse};
use super::types::{Confirmation, SenderWallet, SentTransfer};

/// Transactions requested when looking up a confirmed transfer
const CONFIRMATION_LOOKUP_LIMIT: u32 = 5;

#[derive(Debug, Deserialize)]
struct ToncenterTransaction {
    transaction_id: Option<TransactionId>,
}

#[derive(Debug, Deserialize)]
struct TransactionId {
    hash: Option<String>,
}

/// Build a v4r2 wallet handle from a hex private key
///
/// Only the first 32 bytes are used as the ed25519 seed, so both a bare
/// seed and a 64-byte secret key are accepted.
pub fn sender_wallet(private_key_hex: &str) -> Result<SenderWallet> {
    let signing_key = signing_key_from_hex(private_key_hex)?;
    let wallet = WalletV4R2::new(signing_key.verifying_key().to_bytes());
    let address = wallet.address()?;
    Ok(SenderWallet {
        wallet,
        address,
        signing_key,
    })
}

/// Re-encode a base64 hash in the url-safe alphabet
pub fn url_safe_hash(hash: &str) -> String {
    hash.replace('+', "-").replace('/', "_")
}

impl TonClient {
    /// Sign and broadcast a transfer of `amount` TON to `to_address`
    ///
    /// The first transfer from a wallet also deploys it.
    pub async fn send_ton_transaction(
        &self,
        private_key_hex: &str,
        to_address: &str,
        amount: &str,
    ) -> Result<SentTransfer> {
        let sender = sender_wallet(private_key_hex)?;
        let destination: TonAddress = to_address.parse()?;
        let nano = to_nano(amount)?;

        let seqno = self.provider.seqno(&sender.address).await?;
        let transfer = Transfer::new(destination, nano, seqno);
        let message = sender.wallet.create_transfer(&sender.signing_key, &transfer)?;
        let boc = serialize_boc(&message)?;
        self.provider.send_boc(&boc).await?;

        let sender_address = sender.address.to_friendly(true, true, false);
        info!(
            "Sent {} nanoton from {} to {} at seqno {}",
            nano, sender_address, to_address, seqno
        );

        Ok(SentTransfer {
            wallet: sender,
            seqno,
            sender_address,
        })
    }

    /// Wait until the wallet seqno moves past `original_seqno`, then look up
    /// the newest transaction of `sender_address`
    pub async fn wait_for_confirmation(
        &self,
        wallet: &SenderWallet,
        original_seqno: u32,
        sender_address: &str,
        cancel: &CancellationToken,
    ) -> Result<Confirmation> {
        let policy = self.config.confirmation;

        let mut confirmed = false;
        for attempt in 1..=policy.max_attempts {
            sleep_or_cancel(policy.interval, cancel).await?;
            let current = self.provider.seqno(&wallet.address).await?;
            debug!("seqno poll {}/{}: {}", attempt, policy.max_attempts, current);
            if current > original_seqno {
                confirmed = true;
                break;
            }
        }
        if !confirmed {
            return Err(Error::Timeout(format!(
                "seqno not increased after {} attempts, transaction might not be confirmed yet",
                policy.max_attempts
            )));
        }

        sleep_or_cancel(policy.settle_delay, cancel).await?;

        let url = format!("{}/getTransactions", self.config.testnet_url);
        let response: ToncenterResponse<Vec<ToncenterTransaction>> = self
            .get_json(
                &url,
                &[
                    ("address", sender_address.to_string()),
                    ("limit", CONFIRMATION_LOOKUP_LIMIT.to_string()),
                ],
                self.config.testnet_api_key.as_deref(),
            )
            .await?;

        let transactions = response.result.unwrap_or_default();
        let latest = transactions
            .first()
            .ok_or_else(|| Error::NotFound("No transactions found.".to_string()))?;
        let hash = latest
            .transaction_id
            .as_ref()
            .and_then(|id| id.hash.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        let url_hash = url_safe_hash(&hash);
        let explorer_url = format!(
            "{}/transaction/{}",
            self.config.explorer_url.trim_end_matches('/'),
            url_hash
        );
        info!("Transfer confirmed: {}", explorer_url);

        Ok(Confirmation {
            url_hash,
            explorer_url,
        })
    }

    /// Convenience wrapper around [`TonClient::wait_for_confirmation`]
    pub async fn confirm(&self, sent: &SentTransfer, cancel: &CancellationToken) -> Result<Confirmation> {
        self.wait_for_confirmation(&sent.wallet, sent.seqno, &sent.sender_address, cancel)
            .await
    }
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
