//! Bag-of-cells serialization

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{Error, Result};
use super::cell::{ArcCell, Cell, MAX_CELL_REFS};

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

const FLAG_HAS_INDEX: u8 = 0x80;
const FLAG_HAS_CRC32C: u8 = 0x40;
const FLAG_SIZE_MASK: u8 = 0x07;

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| Error::Cell("unexpected end of BoC".to_string()))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_uint(&mut self, n: usize) -> Result<usize> {
        Ok(self
            .take(n)?
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize))
    }
}

struct RawCell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<usize>,
}

/// Parse a single-root bag of cells
pub fn deserialize_boc(bytes: &[u8]) -> Result<ArcCell> {
    let mut reader = Reader::new(bytes);
    if reader.take(4)? != BOC_MAGIC {
        return Err(Error::Cell("unknown BoC magic".to_string()));
    }

    let flags = reader.read_u8()?;
    let size = (flags & FLAG_SIZE_MASK) as usize;
    if size == 0 || size > 4 {
        return Err(Error::Cell(format!("invalid BoC ref size {}", size)));
    }
    let off_bytes = reader.read_u8()? as usize;
    if off_bytes == 0 || off_bytes > 8 {
        return Err(Error::Cell(format!("invalid BoC offset size {}", off_bytes)));
    }

    let cell_count = reader.read_uint(size)?;
    let root_count = reader.read_uint(size)?;
    let _absent = reader.read_uint(size)?;
    let total_size = reader.read_uint(off_bytes)?;
    if root_count == 0 {
        return Err(Error::Cell("BoC has no roots".to_string()));
    }

    // Counts come from untrusted input; bound them before allocating
    let remaining = bytes.len() - reader.pos;
    if root_count > remaining / size {
        return Err(Error::Cell(format!("BoC claims {} roots in {} bytes", root_count, remaining)));
    }
    if cell_count > remaining / 2 {
        return Err(Error::Cell(format!("BoC claims {} cells in {} bytes", cell_count, remaining)));
    }
    if total_size > remaining {
        return Err(Error::Cell(format!("BoC cell data size {} exceeds {} bytes", total_size, remaining)));
    }

    let mut roots = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        roots.push(reader.read_uint(size)?);
    }
    if flags & FLAG_HAS_INDEX != 0 {
        let index_len = cell_count
            .checked_mul(off_bytes)
            .ok_or_else(|| Error::Cell("BoC index size overflow".to_string()))?;
        reader.take(index_len)?;
    }

    let cells_start = reader.pos;
    let mut raw_cells = Vec::with_capacity(cell_count);
    for _ in 0..cell_count {
        let d1 = reader.read_u8()?;
        let d2 = reader.read_u8()?;

        if d1 & 0x08 != 0 || d1 >> 5 != 0 {
            return Err(Error::Cell("exotic cells are not supported".to_string()));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_CELL_REFS {
            return Err(Error::Cell(format!("cell has {} refs", ref_count)));
        }

        let byte_len = (d2 as usize + 1) / 2;
        let data = reader.take(byte_len)?.to_vec();
        let bit_len = if d2 % 2 == 0 {
            byte_len * 8
        } else {
            let last = *data.last().unwrap_or(&0);
            if last == 0 {
                return Err(Error::Cell("missing completion tag".to_string()));
            }
            byte_len * 8 - (last.trailing_zeros() as usize + 1)
        };

        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            refs.push(reader.read_uint(size)?);
        }
        raw_cells.push(RawCell { data, bit_len, refs });
    }
    if reader.pos - cells_start != total_size {
        return Err(Error::Cell("BoC cell data size mismatch".to_string()));
    }

    if flags & FLAG_HAS_CRC32C != 0 {
        let expected = u32::from_le_bytes(
            reader
                .take(4)?
                .try_into()
                .map_err(|_| Error::Cell("truncated CRC32C".to_string()))?,
        );
        let actual = crc32c(&bytes[..reader.pos - 4]);
        if expected != actual {
            return Err(Error::Cell("BoC CRC32C mismatch".to_string()));
        }
    }

    // References always point forward, so build from the last cell back
    let mut cells: Vec<Option<ArcCell>> = vec![None; cell_count];
    for (index, raw) in raw_cells.into_iter().enumerate().rev() {
        let mut refs = Vec::with_capacity(raw.refs.len());
        for r in raw.refs {
            if r <= index || r >= cell_count {
                return Err(Error::Cell(format!("invalid ref {} in cell {}", r, index)));
            }
            let child = cells[r]
                .clone()
                .ok_or_else(|| Error::Cell(format!("unresolved ref {}", r)))?;
            refs.push(child);
        }
        cells[index] = Some(Arc::new(Cell::new(raw.data, raw.bit_len, refs)?));
    }

    cells
        .get(roots[0])
        .cloned()
        .flatten()
        .ok_or_else(|| Error::Cell(format!("invalid root index {}", roots[0])))
}

/// Serialize a cell tree as a single-root bag of cells with a CRC32C trailer
pub fn serialize_boc(root: &ArcCell) -> Result<Vec<u8>> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    collect_postorder(root, &mut visited, &mut order);
    // Reverse post-order puts every parent ahead of its children
    order.reverse();

    let index: HashMap<[u8; 32], usize> = order
        .iter()
        .enumerate()
        .map(|(i, cell)| (*cell.hash(), i))
        .collect();

    let size = bytes_needed(order.len());
    let mut cell_data = Vec::new();
    for cell in &order {
        cell_data.extend_from_slice(&cell.descriptors());
        cell_data.extend_from_slice(&cell.padded_data());
        for r in cell.refs() {
            let i = index
                .get(r.hash())
                .ok_or_else(|| Error::Cell("ref missing from BoC index".to_string()))?;
            write_uint(&mut cell_data, *i, size);
        }
    }

    let off_bytes = bytes_needed(cell_data.len());
    let mut boc = Vec::with_capacity(cell_data.len() + 32);
    boc.extend_from_slice(&BOC_MAGIC);
    boc.push(FLAG_HAS_CRC32C | size as u8);
    boc.push(off_bytes as u8);
    write_uint(&mut boc, order.len(), size);
    write_uint(&mut boc, 1, size);
    write_uint(&mut boc, 0, size);
    write_uint(&mut boc, cell_data.len(), off_bytes);
    write_uint(&mut boc, 0, size);
    boc.extend_from_slice(&cell_data);

    let crc = crc32c(&boc);
    boc.extend_from_slice(&crc.to_le_bytes());
    Ok(boc)
}

fn collect_postorder(cell: &ArcCell, visited: &mut HashSet<[u8; 32]>, order: &mut Vec<ArcCell>) {
    if !visited.insert(*cell.hash()) {
        return;
    }
    for r in cell.refs() {
        collect_postorder(r, visited, order);
    }
    order.push(cell.clone());
}

fn bytes_needed(value: usize) -> usize {
    let mut bytes = 1;
    while bytes < 8 && value >> (8 * bytes) != 0 {
        bytes += 1;
    }
    bytes
}

fn write_uint(buf: &mut Vec<u8>, value: usize, bytes: usize) {
    let be = (value as u64).to_be_bytes();
    buf.extend_from_slice(&be[8 - bytes..]);
}

/// CRC-32C (Castagnoli), reflected
pub fn crc32c(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for byte in data {
        crc ^= *byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x82F6_3B78
            } else {
                crc >> 1
            };
        }
    }
    crc ^ 0xFFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ton::cell::CellBuilder;
    use crate::ton::wallet::WALLET_V4R2_CODE_BOC;

    #[test]
    fn test_crc32c_check_value() {
        assert_eq!(crc32c(b"123456789"), 0xE306_9283);
    }

    #[test]
    fn test_deserialize_wallet_code() {
        let boc = hex::decode(WALLET_V4R2_CODE_BOC).unwrap();
        let code = deserialize_boc(&boc).unwrap();

        assert_eq!(
            hex::encode(code.hash()),
            "feb5ff6820e2ff0d9483e7e0d62c817d846789fb4ae580c878866d959dabd5c0"
        );
        assert_eq!(code.depth(), 7);
    }

    #[test]
    fn test_serialize_preserves_hash() {
        let leaf = Arc::new(Cell::empty());
        let mut child = CellBuilder::new();
        child.store_u32(0xdead_beef).unwrap().store_bit(true).unwrap();
        child.store_ref(leaf.clone()).unwrap();
        let child = Arc::new(child.build().unwrap());

        let mut root = CellBuilder::new();
        root.store_uint(0b101, 3).unwrap();
        root.store_ref(child).unwrap().store_ref(leaf).unwrap();
        let root = Arc::new(root.build().unwrap());

        let boc = serialize_boc(&root).unwrap();
        let parsed = deserialize_boc(&boc).unwrap();
        assert_eq!(parsed.hash(), root.hash());
    }

    #[test]
    fn test_corrupted_boc_is_rejected() {
        let mut boc = hex::decode(WALLET_V4R2_CODE_BOC).unwrap();
        let middle = boc.len() / 2;
        boc[middle] ^= 0x01;
        assert!(deserialize_boc(&boc).is_err());

        assert!(deserialize_boc(&[0u8; 8]).is_err());

        // header claiming 0xFFFFFFFF cells in a 23-byte input
        let huge = hex::decode("b5ee9c720401ffffffff00000001000000000000000000").unwrap();
        assert!(deserialize_boc(&huge).is_err());
    }
}
