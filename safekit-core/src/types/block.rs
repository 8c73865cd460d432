use crate::types::U64;
use serde::{Serialize, Serializer};
use std::fmt;

/// A block tag accepted by the JSON-RPC API.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockNumber {
    /// The most recently mined block
    Latest,
    /// The pending state, including transactions not yet mined
    Pending,
    /// A block of the given height
    Number(U64),
}

impl Serialize for BlockNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BlockNumber::Latest => serializer.serialize_str("latest"),
            BlockNumber::Pending => serializer.serialize_str("pending"),
            BlockNumber::Number(num) => num.serialize(serializer),
        }
    }
}

impl<T: Into<U64>> From<T> for BlockNumber {
    fn from(num: T) -> Self {
        BlockNumber::Number(num.into())
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockNumber::Latest => write!(f, "latest"),
            BlockNumber::Pending => write!(f, "pending"),
            BlockNumber::Number(num) => write!(f, "0x{num:x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_tags_and_numbers() {
        assert_eq!(serde_json::to_string(&BlockNumber::Pending).unwrap(), r#""pending""#);
        assert_eq!(serde_json::to_string(&BlockNumber::Latest).unwrap(), r#""latest""#);
        assert_eq!(serde_json::to_string(&BlockNumber::from(18u64)).unwrap(), r#""0x12""#);
    }
}
