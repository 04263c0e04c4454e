//! Error types for the ton-wallet library

use thiserror::Error;

/// Custom error type for ton-wallet operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid WIF: {0}")]
    InvalidWif(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Cell error: {0}")]
    Cell(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error! Status: {status}")]
    Http { status: u16 },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Error::Http { status: status.as_u16() },
            None => Error::Network(err.to_string()),
        }
    }
}

/// Result type for ton-wallet operations
pub type Result<T> = std::result::Result<T, Error>;
