use crate::error::{codes, ProviderRpcError};
use serde::{Deserialize, Serialize};

/// A chain the bridge can operate on. The first configured chain acts as the
/// default chain of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id; crosses the RPC boundary as a `0x`-hex string
    #[serde(with = "hex_u64")]
    pub id: u64,
    /// Display name
    pub label: String,
    /// JSON-RPC endpoint for this chain
    #[serde(rename = "rpcUrl")]
    pub rpc_url: String,
}

impl ChainConfig {
    /// The chain id in its RPC wire form.
    pub fn hex_id(&self) -> String {
        format!("0x{:x}", self.id)
    }
}

/// Parses a `0x`-prefixed hex chain id as received over the RPC boundary.
pub fn parse_chain_id(raw: &str) -> Result<u64, ProviderRpcError> {
    raw.strip_prefix("0x")
        .and_then(|hex| u64::from_str_radix(hex, 16).ok())
        .ok_or_else(|| {
            ProviderRpcError::new(codes::INVALID_PARAMS, format!("Invalid chain ID: {raw}"))
        })
}

mod hex_u64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{value:x}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumberOrHex {
            Number(u64),
            Hex(String),
        }
        match NumberOrHex::deserialize(deserializer)? {
            NumberOrHex::Number(value) => Ok(value),
            NumberOrHex::Hex(raw) => super::parse_chain_id(&raw)
                .map_err(|err| de::Error::custom(err.message)),
        }
    }
}
