use async_graphql::{InputValueError, InputValueResult, Scalar, ScalarType, Value};

use ethql_primitives::EvmAddress;

/// 20-byte account address, `0x` followed by 40 hex digits. Mixed-case input
/// must carry a valid EIP-55 checksum; output is always checksummed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Address(pub EvmAddress);

impl Address {
    /// Why `value` is not an address, or `None` when it is one.
    pub fn rejection(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => s.parse::<EvmAddress>().err().map(|err| err.to_string()),
            other => Some(format!("expected a string, found {}", other)),
        }
    }
}

#[Scalar]
impl ScalarType for Address {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(s) = &value {
            s.parse().map(Address).map_err(InputValueError::custom)
        } else {
            Err(InputValueError::expected_type(value))
        }
    }

    fn is_valid(value: &Value) -> bool {
        Self::rejection(value).is_none()
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_checksum())
    }
}
