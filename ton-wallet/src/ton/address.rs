//! TON account addresses
//!
//! Two spellings exist for the same account: the raw form `workchain:hex`
//! and the 48-character user-friendly form, which is base64 (or base64url)
//! over `tag | workchain | hash | crc16`.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;

use crate::error::{Error, Result};

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TEST_ONLY: u8 = 0x80;

const FRIENDLY_LEN: usize = 48;

/// A TON account address
///
/// Equality only considers the workchain and account hash; the flags record
/// how a user-friendly address was spelled when it was parsed.
#[derive(Debug, Clone, Copy)]
pub struct TonAddress {
    pub workchain: i8,
    pub hash: [u8; 32],
    pub bounceable: bool,
    pub test_only: bool,
}

impl TonAddress {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            bounceable: false,
            test_only: false,
        }
    }

    /// Whether `address` is written in the raw `workchain:hex` form
    pub fn is_raw(address: &str) -> bool {
        address.contains(':')
    }

    /// Parse `workchain:hex`
    pub fn from_raw(address: &str) -> Result<Self> {
        let (workchain, hash) = address
            .split_once(':')
            .ok_or_else(|| Error::InvalidAddress(format!("not a raw address: {}", address)))?;

        let workchain = workchain
            .trim()
            .parse::<i8>()
            .map_err(|e| Error::InvalidAddress(format!("invalid workchain in {}: {}", address, e)))?;
        let bytes = hex::decode(hash.trim())
            .map_err(|e| Error::InvalidAddress(format!("invalid hash in {}: {}", address, e)))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidAddress(format!("hash must be 32 bytes: {}", address)))?;

        Ok(Self::new(workchain, hash))
    }

    /// Parse a user-friendly address in either base64 alphabet
    pub fn from_friendly(address: &str) -> Result<Self> {
        if address.len() != FRIENDLY_LEN {
            return Err(Error::InvalidAddress(format!(
                "user-friendly address must be {} characters: {}",
                FRIENDLY_LEN, address
            )));
        }

        let normalized = address.replace('-', "+").replace('_', "/");
        let bytes = STANDARD
            .decode(normalized)
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", address, e)))?;
        if bytes.len() != 36 {
            return Err(Error::InvalidAddress(format!("decoded length {} != 36", bytes.len())));
        }

        let checksum = u16::from_be_bytes([bytes[34], bytes[35]]);
        if crc16(&bytes[..34]) != checksum {
            return Err(Error::InvalidAddress(format!("checksum mismatch: {}", address)));
        }

        let mut tag = bytes[0];
        let test_only = tag & TAG_TEST_ONLY != 0;
        tag &= !TAG_TEST_ONLY;
        let bounceable = match tag {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            other => {
                return Err(Error::InvalidAddress(format!("unknown address tag 0x{:02x}", other)))
            }
        };

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain: bytes[1] as i8,
            hash,
            bounceable,
            test_only,
        })
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// Render the user-friendly form
    pub fn to_friendly(&self, bounceable: bool, url_safe: bool, test_only: bool) -> String {
        let mut tag = if bounceable { TAG_BOUNCEABLE } else { TAG_NON_BOUNCEABLE };
        if test_only {
            tag |= TAG_TEST_ONLY;
        }

        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash);
        let checksum = crc16(&bytes);
        bytes.extend_from_slice(&checksum.to_be_bytes());

        if url_safe {
            URL_SAFE.encode(bytes)
        } else {
            STANDARD.encode(bytes)
        }
    }
}

impl PartialEq for TonAddress {
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash == other.hash
    }
}

impl Eq for TonAddress {}

impl FromStr for TonAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if Self::is_raw(s) {
            Self::from_raw(s)
        } else {
            Self::from_friendly(s)
        }
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

/// CRC-16/XMODEM
fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
