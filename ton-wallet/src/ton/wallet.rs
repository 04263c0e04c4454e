//! Wallet v4 revision 2 contract
//!
//! The account address of a wallet is the hash of its state init (code plus
//! initial data), so it can be computed offline from the public key alone.
//! Transfers are external messages carrying a body signed with the wallet
//! key; the very first transfer also carries the state init, which deploys
//! the contract.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ed25519_dalek::{Signer, SigningKey};
use once_cell::sync::OnceCell;

use crate::error::{Error, Result};
use super::address::TonAddress;
use super::boc::deserialize_boc;
use super::cell::{ArcCell, Cell, CellBuilder};

/// Compiled wallet v4r2 code as a bag of cells
pub const WALLET_V4R2_CODE_BOC: &str = "B5EE9C72410214010002D4000114FF00F4A413F4BCF2C80B010201200203020148040504F8F28308D71820D31FD31FD31F02F823BBF264ED44D0D31FD31FD3FFF404D15143BAF2A15151BAF2A205F901541064F910F2A3F80024A4C8CB1F5240CB1F5230CBFF5210F400C9ED54F80F01D30721C0009F6C519320D74A96D307D402FB00E830E021C001E30021C002E30001C0039130E30D03A4C8CB1F12CB1FCBFF1011121302E6D001D0D3032171B0925F04E022D749C120925F04E002D31F218210706C7567BD22821064737472BDB0925F05E003FA403020FA4401C8CA07CBFFC9D0ED44D0810140D721F404305C810108F40A6FA131B3925F07E005D33FC8258210706C7567BA923830E30D03821064737472BA925F06E30D06070201200809007801FA00F40430F8276F2230500AA121BEF2E0508210706C7567831EB17080185004CB0526CF1658FA0219F400CB6917CB1F5260CB3F20C98040FB0006008A5004810108F45930ED44D0810140D720C801CF16F400C9ED540172B08E23821064737472831EB17080185005CB055003CF1623FA0213CB6ACB1FCB3FC98040FB00925F03E20201200A0B0059BD242B6F6A2684080A06B90FA0218470D4080847A4937D29910CE6903E9FF9837812801B7810148987159F31840201580C0D0011B8C97ED44D0D70B1F8003DB29DFB513420405035C87D010C00B23281F2FFF274006040423D029BE84C600201200E0F0019ADCE76A26840206B90EB85FFC00019AF1DF6A26840106B90EB858FC0006ED207FA00D4D422F90005C8CA0715CBFFC9D077748018C8CB05CB0222CF165005FA0214CB6B12CCCCC973FB00C84014810108F451F2A7020070810108D718FA00D33FC8542047810108F451F2A782106E6F746570748018C8CB05CB025006CF165004FA0214CB6A12CB1FCB3FC973FB0002006C810108D718FA00D33F305224810108F459F2A782106473747270748018C8CB05CB025005CF165003FA0213CB6ACB1F12CB3FC973FB00000AF400C9ED54696225E5";

/// Subwallet id used by wallet v3/v4 on the basechain
pub const DEFAULT_WALLET_ID: u32 = 698_983_191;

/// Pay transfer fees separately and ignore errors in the action phase
pub const SEND_MODE_DEFAULT: u8 = 3;

/// How long a signed transfer stays valid, in seconds
const TRANSFER_TTL_SECS: u64 = 60;

static WALLET_V4R2_CODE: OnceCell<ArcCell> = OnceCell::new();

/// The parsed wallet v4r2 code cell
pub fn wallet_v4r2_code() -> Result<ArcCell> {
    WALLET_V4R2_CODE
        .get_or_try_init(|| {
            let bytes = hex::decode(WALLET_V4R2_CODE_BOC)
                .map_err(|e| Error::Cell(format!("invalid wallet code: {}", e)))?;
            deserialize_boc(&bytes)
        })
        .cloned()
}

/// A transfer of Toncoin from a wallet
#[derive(Debug, Clone)]
pub struct Transfer {
    pub destination: TonAddress,
    /// Amount in nanotons
    pub amount: u128,
    /// Current wallet seqno; 0 also deploys the wallet
    pub seqno: u32,
    pub send_mode: u8,
    /// Unix time after which the message is rejected. Ignored when seqno is 0.
    pub valid_until: Option<u32>,
}

impl Transfer {
    pub fn new(destination: TonAddress, amount: u128, seqno: u32) -> Self {
        Self {
            destination,
            amount,
            seqno,
            send_mode: SEND_MODE_DEFAULT,
            valid_until: None,
        }
    }
}

/// Wallet v4r2 bound to a public key
#[derive(Debug, Clone)]
pub struct WalletV4R2 {
    public_key: [u8; 32],
    workchain: i8,
    wallet_id: u32,
}

impl WalletV4R2 {
    /// Basechain wallet for `public_key`
    pub fn new(public_key: [u8; 32]) -> Self {
        Self::with_workchain(public_key, 0)
    }

    pub fn with_workchain(public_key: [u8; 32], workchain: i8) -> Self {
        Self {
            public_key,
            workchain,
            wallet_id: DEFAULT_WALLET_ID.wrapping_add(workchain as u32),
        }
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    pub fn wallet_id(&self) -> u32 {
        self.wallet_id
    }

    /// Initial persistent data: seqno, wallet id, public key, empty plugin dict
    pub fn data_cell(&self) -> Result<Cell> {
        let mut builder = CellBuilder::new();
        builder
            .store_u32(0)?
            .store_u32(self.wallet_id)?
            .store_bytes(&self.public_key)?
            .store_bit(false)?;
        builder.build()
    }

    /// `StateInit` with code and data only
    pub fn state_init(&self) -> Result<ArcCell> {
        let mut builder = CellBuilder::new();
        // split_depth:none special:none code:just data:just library:none
        builder
            .store_uint(0b00110, 5)?
            .store_ref(wallet_v4r2_code()?)?
            .store_ref(Arc::new(self.data_cell()?))?;
        Ok(Arc::new(builder.build()?))
    }

    pub fn address(&self) -> Result<TonAddress> {
        Ok(TonAddress::new(self.workchain, *self.state_init()?.hash()))
    }

    /// Build the signed external message for `transfer`
    pub fn create_transfer(&self, signing_key: &SigningKey, transfer: &Transfer) -> Result<ArcCell> {
        if signing_key.verifying_key().to_bytes() != self.public_key {
            return Err(Error::InvalidPrivateKey(
                "signing key does not match the wallet public key".to_string(),
            ));
        }

        let order = internal_message(&transfer.destination, transfer.amount)?;

        let mut signing = CellBuilder::new();
        signing.store_u32(self.wallet_id)?;
        if transfer.seqno == 0 {
            signing.store_u32(u32::MAX)?;
        } else {
            signing.store_u32(transfer.valid_until.unwrap_or_else(default_valid_until))?;
        }
        signing
            .store_u32(transfer.seqno)?
            .store_u8(0)?
            .store_u8(transfer.send_mode)?
            .store_ref(order)?;
        let signing = signing.build()?;

        let signature = signing_key.sign(signing.hash());
        let mut body = CellBuilder::new();
        body.store_bytes(&signature.to_bytes())?.store_slice(&signing)?;
        let body = Arc::new(body.build()?);

        // ext_in_msg_info$10 src:addr_none dest import_fee:0
        let mut message = CellBuilder::new();
        message
            .store_uint(0b10, 2)?
            .store_address_none()?
            .store_address(&self.address()?)?
            .store_coins(0)?;
        if transfer.seqno == 0 {
            message.store_bit(true)?.store_either(self.state_init()?)?;
        } else {
            message.store_bit(false)?;
        }
        message.store_either(body)?;

        Ok(Arc::new(message.build()?))
    }
}

/// Internal message carrying `amount` to `destination` with an empty body
fn internal_message(destination: &TonAddress, amount: u128) -> Result<ArcCell> {
    let mut builder = CellBuilder::new();
    builder
        .store_bit(false)?
        // ihr_disabled
        .store_bit(true)?
        .store_bit(destination.bounceable)?
        // bounced
        .store_bit(false)?
        .store_address_none()?
        .store_address(destination)?
        .store_coins(amount)?
        // no extra currencies
        .store_bit(false)?
        .store_coins(0)?
        .store_coins(0)?
        .store_u64(0)?
        .store_u32(0)?
        // no state init
        .store_bit(false)?
        .store_either(Arc::new(Cell::empty()))?;
    Ok(Arc::new(builder.build()?))
}

fn default_valid_until() -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    (now + TRANSFER_TTL_SECS).min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn key_one() -> SigningKey {
        let mut seed = [0u8; 32];
        seed[31] = 1;
        SigningKey::from_bytes(&seed)
    }

    #[test]
    fn test_code_hash() {
        let code = wallet_v4r2_code().unwrap();
        assert_eq!(
            hex::encode(code.hash()),
            "feb5ff6820e2ff0d9483e7e0d62c817d846789fb4ae580c878866d959dabd5c0"
        );
    }

    #[test]
    fn test_wallet_address() {
        let key = key_one();
        let wallet = WalletV4R2::new(key.verifying_key().to_bytes());

        assert_eq!(wallet.data_cell().unwrap().bit_len(), 321);
        assert_eq!(wallet.wallet_id(), DEFAULT_WALLET_ID);

        let address = wallet.address().unwrap();
        assert_eq!(
            address.to_raw(),
            "0:24c6ec9b69e05f95b8185b7be042f70583201055c2ed5d9c1dae978b36acd9d3"
        );
        assert_eq!(
            address.to_friendly(false, true, false),
            "UQAkxuybaeBflbgYW3vgQvcFgyAQVcLtXZwdrpeLNqzZ0xDZ"
        );
    }

    #[test]
    fn test_first_transfer_deploys_wallet() {
        let key = key_one();
        let wallet = WalletV4R2::new(key.verifying_key().to_bytes());
        let destination: TonAddress = "EQCxE6mUtQJKFnGfaROTKOt1lZbDiiX1kCixRv7Nw2Id_sDs".parse().unwrap();

        let message = wallet
            .create_transfer(&key, &Transfer::new(destination, 1_000_000, 0))
            .unwrap();

        // state init refs (code, data) plus the order ref inside the inline body
        assert_eq!(message.refs().len(), 3);
        assert_eq!(message.refs()[0].hash(), wallet_v4r2_code().unwrap().hash());

        let order = &message.refs()[2];
        // first three bits: int_msg_info, ihr_disabled, bounce
        assert_eq!(order.data()[0] >> 5, 0b011);
    }

    fn read_bytes(cell: &Cell, bit_offset: usize, len: usize) -> Vec<u8> {
        (0..len)
            .map(|byte| {
                (0..8).fold(0u8, |acc, bit| {
                    let i = bit_offset + byte * 8 + bit;
                    (acc << 1) | ((cell.data()[i / 8] >> (7 - i % 8)) & 1)
                })
            })
            .collect()
    }

    #[test]
    fn test_transfer_signature_verifies() {
        let key = key_one();
        let wallet = WalletV4R2::new(key.verifying_key().to_bytes());
        let destination = TonAddress::new(0, [9u8; 32]);

        let mut transfer = Transfer::new(destination, 5, 7);
        transfer.valid_until = Some(1_700_000_000);
        let message = wallet.create_transfer(&key, &transfer).unwrap();

        // no state init, so the only ref is the order inside the inline body
        assert_eq!(message.refs().len(), 1);
        let order = message.refs()[0].clone();

        let mut signing = CellBuilder::new();
        signing
            .store_u32(DEFAULT_WALLET_ID).unwrap()
            .store_u32(1_700_000_000).unwrap()
            .store_u32(7).unwrap()
            .store_u8(0).unwrap()
            .store_u8(SEND_MODE_DEFAULT).unwrap()
            .store_ref(order).unwrap();
        let signing = signing.build().unwrap();

        // header (275 bits), no init, inline body marker, then the signature
        assert_eq!(message.bit_len(), 275 + 2 + 512 + 112);
        let signature = read_bytes(&message, 277, 64);
        let signature = Signature::from_slice(&signature).unwrap();
        assert!(key.verifying_key().verify(signing.hash(), &signature).is_ok());
        assert_eq!(read_bytes(&message, 277 + 512, 4), DEFAULT_WALLET_ID.to_be_bytes());
    }

    #[test]
    fn test_mismatched_key_is_rejected() {
        let wallet = WalletV4R2::new([1u8; 32]);
        let transfer = Transfer::new(TonAddress::new(0, [0u8; 32]), 1, 1);
        assert!(matches!(
            wallet.create_transfer(&key_one(), &transfer),
            Err(Error::InvalidPrivateKey(_))
        ));
    }
}
