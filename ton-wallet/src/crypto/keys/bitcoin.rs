//! Bitcoin keys and addresses

use bitcoin_bech32::constants::Network;
use bitcoin_bech32::{u5, WitnessProgram};
use ripemd::Ripemd160;
use secp256k1::{PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use super::derivation::{KeyPair, KeyType, PrivateKey, PublicKey, VersionBytes};
use super::wif::encode_wif;

/// Derive a secp256k1 key pair from 32 secret bytes
pub fn derive_secp256k1_key_pair(secret: &[u8; 32], key_type: KeyType, compressed: bool) -> Result<KeyPair> {
    let secp = Secp256k1::new();
    let secret_key = SecretKey::from_slice(secret)
        .map_err(|e| Error::InvalidPrivateKey(format!("Invalid secret key: {}", e)))?;
    let public_key = Secp256k1PublicKey::from_secret_key(&secp, &secret_key);

    let public_bytes = if compressed {
        public_key.serialize().to_vec()
    } else {
        public_key.serialize_uncompressed().to_vec()
    };

    let private_key = PrivateKey::new(secret_key.secret_bytes().to_vec(), key_type);
    let public_key = PublicKey::new(public_bytes, key_type);

    KeyPair::new(private_key, public_key)
}

/// Derive a Bitcoin key pair
pub fn derive_bitcoin_key_pair(secret: &[u8; 32]) -> Result<KeyPair> {
    derive_secp256k1_key_pair(secret, KeyType::Bitcoin, true)
}

/// Compressed form of a secp256k1 public key in either encoding
pub fn compress_public_key(public_key: &[u8]) -> Result<[u8; 33]> {
    let key = Secp256k1PublicKey::from_slice(public_key)
        .map_err(|e| Error::KeyDerivation(format!("Invalid public key: {}", e)))?;
    Ok(key.serialize())
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha256_hash = Sha256::digest(data);
    Ripemd160::digest(sha256_hash).into()
}

/// Base58check P2PKH address of an arbitrary 20-byte hash
pub fn hash_to_address(hash: &[u8; 20], version: u8) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash);
    bs58::encode(payload).with_check().into_string()
}

/// Base58check P2PKH address; the public key is hashed in the form given
pub fn p2pkh_address(public_key: &[u8], versions: VersionBytes) -> String {
    hash_to_address(&hash160(public_key), versions.pub_key_hash)
}

/// Native segwit (P2WPKH, bech32) address on Bitcoin mainnet
pub fn p2wpkh_address(public_key: &[u8]) -> Result<String> {
    let compressed = compress_public_key(public_key)?;
    let version = u5::try_from_u8(0)
        .map_err(|e| Error::KeyDerivation(format!("Invalid witness version: {}", e)))?;
    let program = WitnessProgram::new(version, hash160(&compressed).to_vec(), Network::Bitcoin)
        .map_err(|e| Error::KeyDerivation(format!("Invalid witness program: {}", e)))?;
    Ok(program.to_address())
}

/// Convert a Bitcoin public key to its address
pub fn public_key_to_address(public_key: &PublicKey) -> Result<String> {
    if public_key.key_type() != KeyType::Bitcoin {
        return Err(Error::KeyDerivation("Not a Bitcoin key".to_string()));
    }
    p2wpkh_address(public_key.as_bytes())
}

/// WIF of a Bitcoin private key
pub fn private_key_to_wif(private_key: &PrivateKey, compressed: bool) -> Result<String> {
    let secret: [u8; 32] = private_key
        .as_bytes()
        .try_into()
        .map_err(|_| Error::InvalidPrivateKey("expected 32 bytes".to_string()))?;
    Ok(encode_wif(&secret, VersionBytes::BITCOIN.private_key, compressed))
}
