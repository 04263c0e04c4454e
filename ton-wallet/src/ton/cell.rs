//! TON cells
//!
//! Only ordinary cells are supported: up to 1023 data bits and four
//! references. The representation hash and depth are computed once, when the
//! cell is built, since every cell is immutable afterwards.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use super::address::TonAddress;

/// Maximum number of data bits in a cell
pub const MAX_CELL_BITS: usize = 1023;
/// Maximum number of references in a cell
pub const MAX_CELL_REFS: usize = 4;

/// Shared cell reference
pub type ArcCell = Arc<Cell>;

/// An immutable ordinary cell
#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    /// Data bits, most significant bit first; bits past `bit_len` are zero
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<ArcCell>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// Create a cell from raw data bits and references
    pub fn new(mut data: Vec<u8>, bit_len: usize, refs: Vec<ArcCell>) -> Result<Self> {
        if bit_len > MAX_CELL_BITS {
            return Err(Error::Cell(format!("cell overflow: {} bits", bit_len)));
        }
        if refs.len() > MAX_CELL_REFS {
            return Err(Error::Cell(format!("cell overflow: {} refs", refs.len())));
        }

        let byte_len = (bit_len + 7) / 8;
        if data.len() < byte_len {
            return Err(Error::Cell(format!(
                "{} data bytes cannot hold {} bits",
                data.len(),
                bit_len
            )));
        }
        data.truncate(byte_len);
        if bit_len % 8 != 0 {
            let last = byte_len - 1;
            data[last] &= 0xFFu8 << (8 - bit_len % 8);
        }

        let depth = refs.iter().map(|r| r.depth + 1).max().unwrap_or(0);

        let mut cell = Self {
            data,
            bit_len,
            refs,
            hash: [0u8; 32],
            depth,
        };
        cell.hash = cell.representation_hash();
        Ok(cell)
    }

    /// A cell with no bits and no references
    pub fn empty() -> Self {
        let mut cell = Self {
            data: Vec::new(),
            bit_len: 0,
            refs: Vec::new(),
            hash: [0u8; 32],
            depth: 0,
        };
        cell.hash = cell.representation_hash();
        cell
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[ArcCell] {
        &self.refs
    }

    /// Representation hash of the cell
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// The two descriptor bytes (`d1` = refs count, `d2` = data length)
    pub fn descriptors(&self) -> [u8; 2] {
        let d1 = self.refs.len() as u8;
        let d2 = (self.bit_len / 8 + (self.bit_len + 7) / 8) as u8;
        [d1, d2]
    }

    /// Data bytes with the completion tag appended when the bit length is
    /// not a multiple of eight
    pub fn padded_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        if self.bit_len % 8 != 0 {
            let last = data.len() - 1;
            data[last] |= 0x80u8 >> (self.bit_len % 8);
        }
        data
    }

    fn representation_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.descriptors());
        hasher.update(self.padded_data());
        for r in &self.refs {
            hasher.update(r.depth.to_be_bytes());
        }
        for r in &self.refs {
            hasher.update(r.hash);
        }
        hasher.finalize().into()
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bit_len)
            .field("data", &hex::encode(&self.data))
            .field("refs", &self.refs.len())
            .field("hash", &hex::encode(self.hash))
            .finish()
    }
}

/// Incremental cell builder
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<ArcCell>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        if self.bit_len >= MAX_CELL_BITS {
            return Err(Error::Cell("cell overflow: too many bits".to_string()));
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 0x80u8 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    /// Store `bits` low bits of `value`, most significant first
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self> {
        if bits > 128 {
            return Err(Error::Cell(format!("cannot store a {}-bit integer", bits)));
        }
        if bits < 128 && value >> bits != 0 {
            return Err(Error::Cell(format!("{} does not fit in {} bits", value, bits)));
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    pub fn store_u8(&mut self, value: u8) -> Result<&mut Self> {
        self.store_uint(value as u128, 8)
    }

    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.store_uint(value as u128, 32)
    }

    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.store_uint(value as u128, 64)
    }

    pub fn store_i8(&mut self, value: i8) -> Result<&mut Self> {
        self.store_uint(value as u8 as u128, 8)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        for byte in bytes {
            self.store_u8(*byte)?;
        }
        Ok(self)
    }

    /// Store an amount as `VarUInteger 16` (4-bit byte length, then the bytes)
    pub fn store_coins(&mut self, amount: u128) -> Result<&mut Self> {
        if amount == 0 {
            return self.store_uint(0, 4);
        }
        let len = 16 - (amount.leading_zeros() as usize) / 8;
        if len > 15 {
            return Err(Error::Cell(format!("coin amount {} is too large", amount)));
        }
        self.store_uint(len as u128, 4)?;
        self.store_uint(amount, len * 8)
    }

    /// Store `addr_std$10 anycast:nothing workchain:int8 address:bits256`
    pub fn store_address(&mut self, address: &TonAddress) -> Result<&mut Self> {
        self.store_uint(0b10, 2)?;
        self.store_bit(false)?;
        self.store_i8(address.workchain)?;
        self.store_bytes(&address.hash)
    }

    /// Store `addr_none$00`
    pub fn store_address_none(&mut self) -> Result<&mut Self> {
        self.store_uint(0, 2)
    }

    pub fn store_ref(&mut self, cell: ArcCell) -> Result<&mut Self> {
        if self.refs.len() >= MAX_CELL_REFS {
            return Err(Error::Cell("cell overflow: too many refs".to_string()));
        }
        self.refs.push(cell);
        Ok(self)
    }

    pub fn ref_count(&self) -> usize {
        self.refs.len()
    }

    /// Append the bits and references of another cell
    pub fn store_slice(&mut self, cell: &Cell) -> Result<&mut Self> {
        for i in 0..cell.bit_len() {
            self.store_bit((cell.data()[i / 8] >> (7 - i % 8)) & 1 == 1)?;
        }
        for r in cell.refs() {
            self.store_ref(r.clone())?;
        }
        Ok(self)
    }

    /// Store `Either X ^X`: inline when the cell fits, otherwise as a ref
    pub fn store_either(&mut self, cell: ArcCell) -> Result<&mut Self> {
        let fits_bits = self.bit_len + 1 + cell.bit_len() <= MAX_CELL_BITS;
        let fits_refs = self.refs.len() + cell.refs().len() <= MAX_CELL_REFS;
        if fits_bits && fits_refs {
            self.store_bit(false)?;
            self.store_slice(&cell)
        } else {
            self.store_bit(true)?;
            self.store_ref(cell)
        }
    }

    pub fn build(&self) -> Result<Cell> {
        Cell::new(self.data.clone(), self.bit_len, self.refs.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cell_hash() {
        // sha256 of the two zero descriptor bytes
        let cell = Cell::empty();
        assert_eq!(
            hex::encode(cell.hash()),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert_eq!(cell.depth(), 0);
        assert_eq!(CellBuilder::new().build().unwrap(), cell);
    }

    #[test]
    fn test_completion_tag() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b00110, 5).unwrap();
        let cell = builder.build().unwrap();

        assert_eq!(cell.bit_len(), 5);
        assert_eq!(cell.descriptors(), [0, 1]);
        assert_eq!(cell.padded_data(), vec![0b0011_0100]);
    }

    #[test]
    fn test_depth_follows_refs() {
        let leaf = Arc::new(Cell::empty());
        let mut middle = CellBuilder::new();
        middle.store_ref(leaf.clone()).unwrap();
        let middle = Arc::new(middle.build().unwrap());

        let mut root = CellBuilder::new();
        root.store_ref(middle).unwrap().store_ref(leaf).unwrap();
        let root = root.build().unwrap();

        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn test_coins_encoding() {
        let mut builder = CellBuilder::new();
        builder.store_coins(0).unwrap();
        assert_eq!(builder.bit_len(), 4);

        let mut builder = CellBuilder::new();
        builder.store_coins(1_000_000_000).unwrap();
        // 4-bit length (4 bytes) followed by 32 bits of value
        assert_eq!(builder.bit_len(), 36);
        let cell = builder.build().unwrap();
        assert_eq!(cell.data()[0] >> 4, 4);
    }

    #[test]
    fn test_store_either_falls_back_to_ref() {
        let mut small = CellBuilder::new();
        small.store_u32(42).unwrap();
        let small = Arc::new(small.build().unwrap());

        let mut builder = CellBuilder::new();
        builder.store_either(small.clone()).unwrap();
        assert_eq!(builder.bit_len(), 33);
        assert_eq!(builder.ref_count(), 0);

        let mut full = CellBuilder::new();
        for _ in 0..1000 {
            full.store_bit(false).unwrap();
        }
        full.store_either(small).unwrap();
        assert_eq!(full.bit_len(), 1001);
        assert_eq!(full.ref_count(), 1);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut builder = CellBuilder::new();
        for _ in 0..MAX_CELL_BITS {
            builder.store_bit(true).unwrap();
        }
        assert!(builder.store_bit(true).is_err());

        let mut builder = CellBuilder::new();
        assert!(builder.store_uint(256, 8).is_err());
        for _ in 0..MAX_CELL_REFS {
            builder.store_ref(Arc::new(Cell::empty())).unwrap();
        }
        assert!(builder.store_ref(Arc::new(Cell::empty())).is_err());
    }
}
