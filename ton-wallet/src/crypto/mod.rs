//! Cryptographic primitives and operations
//!
//! Key derivation for Bitcoin, FLO and TON, and the multi-chain deriver
//! that produces all three from a single secret.

pub mod keys;
pub mod multichain;

pub use keys::*;
pub use multichain::{derive_multi_chain, recover_from_input, ChainKey, KeyInput, MultiChainKeys};
