//! FLO keys, addresses and identity helpers
//!
//! FLO shares Bitcoin's key and address machinery and differs only in its
//! version bytes.

use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use super::bitcoin::{derive_secp256k1_key_pair, hash160, hash_to_address, p2pkh_address};
use super::derivation::{KeyPair, KeyType, PrivateKey, PublicKey, VersionBytes};
use super::wif::encode_wif;

/// A freshly generated FLO identity
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloId {
    #[serde(rename = "floID")]
    pub flo_id: String,
    /// Compressed public key, hex
    pub pub_key: String,
    /// Private key as FLO WIF
    pub priv_key: String,
}

impl std::fmt::Debug for FloId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloId")
            .field("flo_id", &self.flo_id)
            .field("pub_key", &self.pub_key)
            .finish_non_exhaustive()
    }
}

/// Derive a FLO key pair
pub fn derive_flo_key_pair(secret: &[u8; 32], compressed: bool) -> Result<KeyPair> {
    derive_secp256k1_key_pair(secret, KeyType::Flo, compressed)
}

/// Convert a FLO public key to its P2PKH address
pub fn public_key_to_address(public_key: &PublicKey) -> Result<String> {
    if public_key.key_type() != KeyType::Flo {
        return Err(Error::KeyDerivation("Not a FLO key".to_string()));
    }
    Ok(p2pkh_address(public_key.as_bytes(), VersionBytes::FLO))
}

/// WIF of a FLO private key
pub fn private_key_to_wif(private_key: &PrivateKey, compressed: bool) -> Result<String> {
    let secret: [u8; 32] = private_key
        .as_bytes()
        .try_into()
        .map_err(|_| Error::InvalidPrivateKey("expected 32 bytes".to_string()))?;
    Ok(encode_wif(&secret, VersionBytes::FLO.private_key, compressed))
}

/// Generate a new random FLO identity with a compressed key
pub fn generate_new_id() -> Result<FloId> {
    let secret_key = SecretKey::new(&mut OsRng);
    let key_pair = derive_flo_key_pair(&secret_key.secret_bytes(), true)?;

    Ok(FloId {
        flo_id: public_key_to_address(key_pair.public_key())?,
        pub_key: hex::encode(key_pair.public_key().as_bytes()),
        priv_key: private_key_to_wif(key_pair.private_key(), true)?,
    })
}

/// FLO address derived from the hash of an arbitrary string
pub fn hash_id(input: &str) -> String {
    hash_to_address(&hash160(input.as_bytes()), VersionBytes::FLO.pub_key_hash)
}

/// A random FLO address with no known key
pub fn tmp_id() -> String {
    let mut hash = [0u8; 20];
    OsRng.fill_bytes(&mut hash);
    hash_to_address(&hash, VersionBytes::FLO.pub_key_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::wif::decode_wif;

    #[test]
    fn test_flo_address() {
        let mut secret = [0u8; 32];
        secret[31] = 1;

        let compressed = derive_flo_key_pair(&secret, true).unwrap();
        assert_eq!(
            public_key_to_address(compressed.public_key()).unwrap(),
            "FGWP1xKhDP5RmV525TmUoEwX9mTZwp3sJn"
        );
        assert_eq!(
            private_key_to_wif(compressed.private_key(), true).unwrap(),
            "R7WnCJjdY4LQqMAD9MLZmNRPZpkL5DCVY1YFD3US2zr1uTVbv7Sr"
        );

        let uncompressed = derive_flo_key_pair(&secret, false).unwrap();
        assert_eq!(
            public_key_to_address(uncompressed.public_key()).unwrap(),
            "FK7V2tq9AJFaYY7zBjoGjcaakQYiroFn5R"
        );
    }

    #[test]
    fn test_generate_new_id() {
        let id = generate_new_id().unwrap();
        assert!(id.flo_id.starts_with('F'));
        assert_eq!(id.pub_key.len(), 66);

        let wif = decode_wif(&id.priv_key).unwrap();
        assert_eq!(wif.version, VersionBytes::FLO.private_key);
        assert!(wif.compressed);
        let key_pair = derive_flo_key_pair(&wif.secret, true).unwrap();
        assert_eq!(public_key_to_address(key_pair.public_key()).unwrap(), id.flo_id);
    }

    #[test]
    fn test_hash_id_is_deterministic() {
        assert_eq!(hash_id("alice"), hash_id("alice"));
        assert_ne!(hash_id("alice"), hash_id("bob"));
        assert!(hash_id("alice").starts_with('F'));
    }

    #[test]
    fn test_tmp_id() {
        let first = tmp_id();
        assert!(first.starts_with('F'));
        assert_eq!(bs58::decode(&first).with_check(None).into_vec().unwrap().len(), 21);
        assert_ne!(first, tmp_id());
    }
}
