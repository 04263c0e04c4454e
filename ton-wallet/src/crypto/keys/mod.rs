//! Key derivation and management
//!
//! This module provides functionality for deriving and managing keys for
//! Bitcoin, FLO and TON.

pub mod bitcoin;
pub mod flo;
pub mod ton;
pub mod wif;
mod derivation;

pub use derivation::*;
