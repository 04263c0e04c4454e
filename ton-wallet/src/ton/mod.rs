//! TON primitives: cells, bags of cells, addresses and the v4r2 wallet

pub mod address;
pub mod boc;
pub mod cell;
pub mod units;
pub mod wallet;

pub use address::TonAddress;
pub use boc::{deserialize_boc, serialize_boc};
pub use cell::{ArcCell, Cell, CellBuilder};
pub use units::{from_nano, to_nano};
pub use wallet::{Transfer, WalletV4R2};
