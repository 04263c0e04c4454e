//! Multi-chain key derivation
//!
//! One root secret (WIF, raw hex, or freshly generated) yields an address and
//! private key for Bitcoin, FLO and TON. The secp256k1 public key is derived
//! once; each chain then encodes it with its own version bytes.

use rand::rngs::OsRng;
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use super::keys::wif::decode_wif;
use super::keys::{bitcoin, flo, ton, derive_key_pair, KeyType};

/// Address and private key for one chain
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainKey {
    /// `None` when the address could not be computed
    pub address: Option<String>,
    #[serde(rename = "privateKey")]
    pub private_key: String,
}

impl std::fmt::Debug for ChainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainKey")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Keys for every supported chain, all derived from one secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiChainKeys {
    #[serde(rename = "BTC")]
    pub btc: ChainKey,
    #[serde(rename = "FLO")]
    pub flo: ChainKey,
    #[serde(rename = "TON")]
    pub ton: ChainKey,
}

/// How a user supplied key was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput<'a> {
    /// Nothing supplied, generate a new key
    Random,
    /// 64 hex characters of private key
    RawHex(&'a str),
    /// Anything else is decoded as WIF
    Wif(&'a str),
}

impl<'a> KeyInput<'a> {
    pub fn classify(input: Option<&'a str>) -> Self {
        let input = match input {
            Some(input) if !input.is_empty() => input,
            _ => return KeyInput::Random,
        };

        let hex_only = input.chars().all(|c| c.is_ascii_hexdigit());
        if hex_only && (input.len() == 64 || input.len() == 128) {
            KeyInput::RawHex(&input[..64])
        } else {
            KeyInput::Wif(input)
        }
    }
}

/// The resolved root secret
struct RootKey {
    secret: [u8; 32],
    compressed: bool,
}

fn resolve_root_key(input: KeyInput<'_>) -> Result<RootKey> {
    match input {
        KeyInput::Random => Ok(RootKey {
            secret: SecretKey::new(&mut OsRng).secret_bytes(),
            compressed: true,
        }),
        KeyInput::RawHex(hex_key) => {
            let secret = hex::decode(hex_key)
                .map_err(|e| Error::InvalidPrivateKey(e.to_string()))?
                .try_into()
                .map_err(|_| Error::InvalidPrivateKey("expected 32 bytes".to_string()))?;
            Ok(RootKey {
                secret,
                compressed: true,
            })
        }
        KeyInput::Wif(wif) => {
            let wif = decode_wif(wif).map_err(|e| {
                warn!("Invalid WIF format: {}", e);
                e
            })?;
            Ok(RootKey {
                secret: wif.secret,
                compressed: wif.compressed,
            })
        }
    }
}

/// Derive Bitcoin, FLO and TON keys from one secret
///
/// `input` may be a WIF key of any version, 64 or 128 hex characters (only
/// the first 64 are used), or empty to generate a new key. The BTC address
/// is always the P2WPKH of the compressed public key, even for an
/// uncompressed WIF; the BTC WIF and the FLO keys keep the input's form.
pub fn derive_multi_chain(input: Option<&str>) -> Result<MultiChainKeys> {
    let input = KeyInput::classify(input);
    debug!("Deriving multi-chain keys from {:?} input", input_kind(&input));
    let root = resolve_root_key(input)?;

    // Native segwit only defines compressed keys
    let btc_pair = derive_key_pair(&root.secret, KeyType::Bitcoin, true)?;
    let btc = ChainKey {
        address: Some(bitcoin::public_key_to_address(btc_pair.public_key())?),
        private_key: bitcoin::private_key_to_wif(btc_pair.private_key(), root.compressed)?,
    };

    let flo_pair = derive_key_pair(&root.secret, KeyType::Flo, root.compressed)?;
    let flo = ChainKey {
        address: Some(flo::public_key_to_address(flo_pair.public_key())?),
        private_key: flo::private_key_to_wif(flo_pair.private_key(), root.compressed)?,
    };

    let ton_pair = derive_key_pair(&root.secret, KeyType::Ton, true)?;
    let address = match ton::public_key_to_address(ton_pair.public_key()) {
        Ok(address) => Some(address.to_friendly(false, true, false)),
        Err(e) => {
            warn!("Failed to compute TON wallet address: {}", e);
            None
        }
    };
    let ton = ChainKey {
        address,
        private_key: hex::encode(ton_pair.private_key().as_bytes()),
    };

    Ok(MultiChainKeys { btc, flo, ton })
}

/// Trim the user's input and derive keys from it
pub fn recover_from_input(input: &str) -> Result<MultiChainKeys> {
    derive_multi_chain(Some(input.trim()))
}

fn input_kind(input: &KeyInput<'_>) -> &'static str {
    match input {
        KeyInput::Random => "random",
        KeyInput::RawHex(_) => "hex",
        KeyInput::Wif(_) => "WIF",
    }
}
