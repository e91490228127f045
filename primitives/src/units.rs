use eth_primitive_types::U256;
use ethers_core::utils::{self, ConversionError};

/// Ether denominations, named after their number of decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Unit {
    #[default]
    Wei,
    Kwei,
    Mwei,
    Gwei,
    Szabo,
    Finney,
    Ether,
}

impl Unit {
    pub fn decimals(self) -> u32 {
        match self {
            Unit::Wei => 0,
            Unit::Kwei => 3,
            Unit::Mwei => 6,
            Unit::Gwei => 9,
            Unit::Szabo => 12,
            Unit::Finney => 15,
            Unit::Ether => 18,
        }
    }
}

/// Exact decimal rendering of a wei amount in `unit`, without trailing
/// fractional zeros.
pub fn format_units(amount: U256, unit: Unit) -> Result<String, ConversionError> {
    let formatted = utils::format_units(amount, unit.decimals())?;

    Ok(match formatted.split_once('.') {
        Some((integer, fraction)) => match fraction.trim_end_matches('0') {
            "" => integer.to_owned(),
            fraction => format!("{}.{}", integer, fraction),
        },
        None => formatted,
    })
}
