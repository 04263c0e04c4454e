//! TON Wallet Core - TON client and multi-chain key SDK
//!
//! This library provides balance, history and transfer operations against
//! the TON indexers, the TON primitives they rest on (cells, bags of cells,
//! addresses, the v4r2 wallet), and a deriver that produces Bitcoin, FLO and
//! TON keys from a single secret.

pub mod error;
pub mod crypto;
pub mod ton;
pub mod transaction;

// Re-export commonly used types for convenience
pub use crypto::{derive_multi_chain, recover_from_input, ChainKey, MultiChainKeys};
pub use error::{Error, Result};
pub use ton::TonAddress;
pub use transaction::{ClientConfig, ConfirmationPolicy, PageOptions, TonClient, WalletProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
