//! Wallet Import Format

use crate::error::{Error, Result};

/// Suffix byte marking a key whose public key is used compressed
const COMPRESSED_FLAG: u8 = 0x01;

/// A decoded WIF private key
#[derive(Clone, PartialEq, Eq)]
pub struct Wif {
    pub version: u8,
    pub secret: [u8; 32],
    pub compressed: bool,
}

impl std::fmt::Debug for Wif {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wif")
            .field("version", &self.version)
            .field("compressed", &self.compressed)
            .finish_non_exhaustive()
    }
}

/// Encode 32 secret bytes as WIF with the given version byte
pub fn encode_wif(secret: &[u8; 32], version: u8, compressed: bool) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(version);
    payload.extend_from_slice(secret);
    if compressed {
        payload.push(COMPRESSED_FLAG);
    }
    bs58::encode(payload).with_check().into_string()
}

/// Decode a WIF string of any version
pub fn decode_wif(wif: &str) -> Result<Wif> {
    let payload = bs58::decode(wif.trim())
        .with_check(None)
        .into_vec()
        .map_err(|e| Error::InvalidWif(e.to_string()))?;

    let (version, key) = payload
        .split_first()
        .ok_or_else(|| Error::InvalidWif("empty payload".to_string()))?;

    let (key, compressed) = match key.len() {
        32 => (key, false),
        33 if key[32] == COMPRESSED_FLAG => (&key[..32], true),
        len => {
            return Err(Error::InvalidWif(format!("unexpected key length {}", len)));
        }
    };

    let mut secret = [0u8; 32];
    secret.copy_from_slice(key);
    Ok(Wif {
        version: *version,
        secret,
        compressed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_one() -> [u8; 32] {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        secret
    }

    #[test]
    fn test_encode_wif() {
        assert_eq!(
            encode_wif(&key_one(), 0x80, true),
            "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn"
        );
        assert_eq!(
            encode_wif(&key_one(), 0x80, false),
            "5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf"
        );
    }

    #[test]
    fn test_decode_wif() {
        let wif = decode_wif("R7WnCJjdY4LQqMAD9MLZmNRPZpkL5DCVY1YFD3US2zr1uTVbv7Sr").unwrap();
        assert_eq!(wif.version, 0xa3);
        assert!(wif.compressed);
        assert_eq!(wif.secret, key_one());

        let wif = decode_wif("5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf").unwrap();
        assert_eq!(wif.version, 0x80);
        assert!(!wif.compressed);
    }

    #[test]
    fn test_bad_checksum() {
        let result = decode_wif("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWo");
        assert!(matches!(result, Err(Error::InvalidWif(_))));
        assert!(decode_wif("0OIl").is_err());
    }
}
