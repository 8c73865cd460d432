//! Serde helpers for the looser numeric encodings found in typed-data
//! payloads.

use crate::types::U256;
use serde::{Deserialize, Deserializer};
use std::{convert::TryFrom, str::FromStr};

/// A number that may arrive as a JSON number, a decimal string or `0x` hex.
/// Typed-data payloads produced by JavaScript tooling commonly stringify
/// their uints.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum StringifiedNumeric {
    /// Already a quantity
    U256(U256),
    /// A JSON number
    Num(serde_json::Number),
    /// A decimal or `0x`-prefixed string
    String(String),
}

impl TryFrom<StringifiedNumeric> for U256 {
    type Error = String;

    fn try_from(value: StringifiedNumeric) -> Result<Self, Self::Error> {
        match value {
            StringifiedNumeric::U256(n) => Ok(n),
            StringifiedNumeric::Num(n) => {
                U256::from_dec_str(&n.to_string()).map_err(|err| err.to_string())
            }
            StringifiedNumeric::String(s) => {
                if let Some(hex) = s.strip_prefix("0x") {
                    U256::from_str(hex).map_err(|err| err.to_string())
                } else {
                    U256::from_dec_str(&s).map_err(|err| err.to_string())
                }
            }
        }
    }
}

/// Deserializes an optional quantity that may be stringified.
pub fn deserialize_stringified_numeric_opt<'de, D>(
    deserializer: D,
) -> Result<Option<U256>, D::Error>
where
    D: Deserializer<'de>,
{
    if let Some(num) = Option::<StringifiedNumeric>::deserialize(deserializer)? {
        num.try_into().map(Some).map_err(serde::de::Error::custom)
    } else {
        Ok(None)
    }
}
