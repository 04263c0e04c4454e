//! TON ed25519 keys

use ed25519_dalek::SigningKey;

use crate::error::{Error, Result};
use crate::ton::{TonAddress, WalletV4R2};
use super::derivation::{KeyPair, KeyType, PrivateKey, PublicKey};

/// Derive a TON key pair from a 32-byte ed25519 seed
///
/// The private key holds the 64-byte secret key (seed followed by public key).
pub fn derive_ton_key_pair(seed: &[u8; 32]) -> Result<KeyPair> {
    let signing_key = SigningKey::from_bytes(seed);
    let private_key = PrivateKey::new(signing_key.to_keypair_bytes().to_vec(), KeyType::Ton);
    let public_key = PublicKey::new(signing_key.verifying_key().to_bytes().to_vec(), KeyType::Ton);
    KeyPair::new(private_key, public_key)
}

/// Signing key from the first 32 bytes of a hex encoded private key
///
/// Accepts a bare 32-byte seed as well as a 64-byte secret key.
pub fn signing_key_from_hex(private_key_hex: &str) -> Result<SigningKey> {
    let private_key_hex = private_key_hex.trim();
    let seed_hex = private_key_hex
        .get(..64)
        .ok_or_else(|| Error::InvalidPrivateKey("expected at least 32 bytes of hex".to_string()))?;
    let seed: [u8; 32] = hex::decode(seed_hex)
        .map_err(|e| Error::InvalidPrivateKey(e.to_string()))?
        .try_into()
        .map_err(|_| Error::InvalidPrivateKey("expected 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&seed))
}

/// The wallet v4r2 address of a TON public key
pub fn public_key_to_address(public_key: &PublicKey) -> Result<TonAddress> {
    if public_key.key_type() != KeyType::Ton {
        return Err(Error::KeyDerivation("Not a TON key".to_string()));
    }
    let bytes: [u8; 32] = public_key
        .as_bytes()
        .try_into()
        .map_err(|_| Error::KeyDerivation("TON public key must be 32 bytes".to_string()))?;
    WalletV4R2::new(bytes).address()
}
