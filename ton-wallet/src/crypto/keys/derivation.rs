//! Common key types shared by the chain-specific modules

use crate::error::{Error, Result};

/// Supported key types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum KeyType {
    /// Bitcoin (secp256k1)
    Bitcoin,
    /// FLO (secp256k1, Bitcoin-derived)
    Flo,
    /// TON (ed25519)
    Ton,
}

/// Version bytes used when encoding addresses and WIF keys
///
/// Passed to the encoders explicitly so that each chain's prefixes never
/// leak into another chain's derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionBytes {
    /// Prefix of base58check P2PKH addresses
    pub pub_key_hash: u8,
    /// Prefix of WIF private keys
    pub private_key: u8,
}

impl VersionBytes {
    pub const BITCOIN: VersionBytes = VersionBytes {
        pub_key_hash: 0x00,
        private_key: 0x80,
    };

    pub const FLO: VersionBytes = VersionBytes {
        pub_key_hash: 0x23,
        private_key: 0xa3,
    };
}

/// A private key for a specific blockchain
#[derive(Clone)]
pub struct PrivateKey {
    /// The raw private key bytes
    bytes: Vec<u8>,
    /// The type of key
    key_type: KeyType,
}

impl PrivateKey {
    /// Create a new private key from bytes
    pub fn new(bytes: Vec<u8>, key_type: KeyType) -> Self {
        Self { bytes, key_type }
    }

    /// Get the raw private key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the key type
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type)
            .field("bytes", &"<redacted>")
            .finish()
    }
}

/// A public key for a specific blockchain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    /// The raw public key bytes
    bytes: Vec<u8>,
    /// The type of key
    key_type: KeyType,
}

impl PublicKey {
    /// Create a new public key from bytes
    pub fn new(bytes: Vec<u8>, key_type: KeyType) -> Self {
        Self { bytes, key_type }
    }

    /// Get the raw public key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the key type
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }
}

/// A key pair for a specific blockchain
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// The private key
    private_key: PrivateKey,
    /// The public key
    public_key: PublicKey,
}

impl KeyPair {
    /// Create a new key pair
    pub fn new(private_key: PrivateKey, public_key: PublicKey) -> Result<Self> {
        if private_key.key_type() != public_key.key_type() {
            return Err(Error::KeyDerivation("Key type mismatch".to_string()));
        }
        Ok(Self { private_key, public_key })
    }

    /// Get the private key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the key type
    pub fn key_type(&self) -> KeyType {
        self.private_key.key_type()
    }
}

/// Derive a key pair from 32 secret bytes for a specific blockchain
///
/// `compressed` selects the public key encoding for the secp256k1 chains and
/// is ignored for TON.
pub fn derive_key_pair(secret: &[u8; 32], key_type: KeyType, compressed: bool) -> Result<KeyPair> {
    match key_type {
        KeyType::Bitcoin | KeyType::Flo => {
            crate::crypto::keys::bitcoin::derive_secp256k1_key_pair(secret, key_type, compressed)
        }
        KeyType::Ton => crate::crypto::keys::ton::derive_ton_key_pair(secret),
    }
}
