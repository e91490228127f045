use eth_primitive_types::U256;

pub mod address;
pub mod encoding;
pub mod units;

pub use address::{AddressError, EvmAddress};
pub use encoding::{decode_hex, parse_quantity, HexError, To0x};
pub use units::{format_units, Unit};

/// State of a single account as read from a state source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountInfo {
    pub balance: U256,
    pub nonce: u64,
    pub code: Vec<u8>,
}
