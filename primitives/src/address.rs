use std::str::FromStr;

use eth_primitive_types::H160;
use thiserror::Error;

use crate::encoding::strip_0x;

const ADDRESS_DIGITS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must have 40 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("address contains non-hex characters")]
    InvalidHex,
    #[error("address checksum mismatch")]
    InvalidChecksum,
}

/// 20-byte Ethereum account address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EvmAddress([u8; 20]);

impl EvmAddress {
    pub fn zero() -> Self {
        Self::default()
    }

    /// EIP-55 mixed-case representation, `0x` prefixed.
    pub fn to_checksum(&self) -> String {
        ethers_core::utils::to_checksum(&H160::from(self.0), None)
    }

    /// Accepts addresses the way geth writes them in genesis files: the `0x`
    /// prefix is optional and the checksum is not verified.
    pub fn parse_lenient(s: &str) -> Result<Self, AddressError> {
        let digits = strip_0x(s).unwrap_or(s);
        Self::decode_digits(digits)
    }

    fn decode_digits(digits: &str) -> Result<Self, AddressError> {
        if digits.len() != ADDRESS_DIGITS {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| AddressError::InvalidHex)?;

        Ok(Self(bytes))
    }
}

fn is_mixed_case(digits: &str) -> bool {
    digits.chars().any(|c| c.is_ascii_lowercase()) && digits.chars().any(|c| c.is_ascii_uppercase())
}

impl FromStr for EvmAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_0x(s).ok_or(AddressError::MissingPrefix)?;
        let address = Self::decode_digits(digits)?;

        if is_mixed_case(digits) && address.to_checksum()[2..] != *digits {
            return Err(AddressError::InvalidChecksum);
        }

        Ok(address)
    }
}

impl From<[u8; 20]> for EvmAddress {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<H160> for EvmAddress {
    fn from(address: H160) -> Self {
        Self(address.into())
    }
}

impl From<EvmAddress> for H160 {
    fn from(address: EvmAddress) -> Self {
        address.0.into()
    }
}

impl std::fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}
