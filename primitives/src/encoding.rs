use eth_primitive_types::U256;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HexError {
    #[error("invalid hex data: {0}")]
    Data(#[from] hex::FromHexError),
    #[error("invalid quantity {0:?}")]
    Quantity(String),
}

/// Renders byte strings the way Ethereum JSON-RPC does: `0x` prefixed, in full.
pub trait To0x {
    fn to_0x(&self) -> String;
}

impl To0x for [u8] {
    fn to_0x(&self) -> String {
        format!("0x{}", hex::encode(self))
    }
}

impl To0x for Vec<u8> {
    fn to_0x(&self) -> String {
        self.as_slice().to_0x()
    }
}

pub(crate) fn strip_0x(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

/// Decodes hex data with or without the `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, HexError> {
    Ok(hex::decode(strip_0x(s).unwrap_or(s))?)
}

/// Parses a quantity written either as `0x` hex or as a decimal string.
pub fn parse_quantity(s: &str) -> Result<U256, HexError> {
    let s = s.trim();
    let parsed = match strip_0x(s) {
        Some("") => return Err(HexError::Quantity(s.to_owned())),
        Some(digits) => U256::from_str_radix(digits, 16).ok(),
        None => U256::from_dec_str(s).ok(),
    };

    parsed.ok_or_else(|| HexError::Quantity(s.to_owned()))
}
