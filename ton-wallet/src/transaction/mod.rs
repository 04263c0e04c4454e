//! Balance, history and transfer operations against TON
//!
//! This module provides the indexer client, the wallet provider used to
//! read seqno and broadcast messages, and the transfer flow built on them.

pub mod client;
pub mod provider;
pub mod transfer;
pub mod types;

pub use client::TonClient;
pub use provider::*;
pub use transfer::{sender_wallet, url_safe_hash};
pub use types::*;
