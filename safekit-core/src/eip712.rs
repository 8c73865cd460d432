//! Dynamic [EIP-712](https://eips.ethereum.org/EIPS/eip-712) typed-data
//! hashing.
//!
//! Payloads arrive as JSON (optionally stringified, which is how most
//! JavaScript tooling submits them over `eth_signTypedData`) and are hashed
//! without any compile-time knowledge of their struct layout.

use crate::{
    types::{serde_helpers::StringifiedNumeric, Address, Bytes, H256, U256},
    utils::keccak256,
};
use ethabi::{encode, param_type::Reader, ParamType, Token};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Error typed data encoding can fail with.
#[derive(Debug, Error)]
pub enum Eip712Error {
    /// A type or value in the payload could not be encoded
    #[error("failed to encode typed data: {0}")]
    Message(String),
    /// The payload is not valid JSON for the declared types
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

/// Custom types used by a typed-data message.
pub type Types = BTreeMap<String, Vec<TypedDataField>>;

/// A name/type pair inside a struct definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypedDataField {
    /// Field name
    pub name: String,
    /// Field type, e.g. `uint256` or a custom struct name
    #[serde(rename = "type")]
    pub r#type: String,
}

/// EIP-712 domain attributes used in determining the domain separator.
/// Unused fields are left out of the struct type.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    /// The user readable name of signing domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The current major version of the signing domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// The EIP-155 chain id
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::types::serde_helpers::deserialize_stringified_numeric_opt"
    )]
    pub chain_id: Option<U256>,

    /// The address of the contract that will verify the signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,

    /// A disambiguating salt for the protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<H256>,
}

impl Eip712Domain {
    /// Computes the domain separator. The struct type only contains the
    /// fields that are actually set.
    pub fn separator(&self) -> [u8; 32] {
        let mut ty = "EIP712Domain(".to_string();

        let mut tokens = Vec::new();
        let mut needs_comma = false;
        if let Some(ref name) = self.name {
            ty += "string name";
            tokens.push(Token::Uint(U256::from(keccak256(name))));
            needs_comma = true;
        }

        if let Some(ref version) = self.version {
            if needs_comma {
                ty.push(',');
            }
            ty += "string version";
            tokens.push(Token::Uint(U256::from(keccak256(version))));
            needs_comma = true;
        }

        if let Some(chain_id) = self.chain_id {
            if needs_comma {
                ty.push(',');
            }
            ty += "uint256 chainId";
            tokens.push(Token::Uint(chain_id));
            needs_comma = true;
        }

        if let Some(verifying_contract) = self.verifying_contract {
            if needs_comma {
                ty.push(',');
            }
            ty += "address verifyingContract";
            tokens.push(Token::Address(verifying_contract));
            needs_comma = true;
        }

        if let Some(salt) = self.salt {
            if needs_comma {
                ty.push(',');
            }
            ty += "bytes32 salt";
            tokens.push(Token::Uint(U256::from_big_endian(salt.as_bytes())));
        }

        ty.push(')');

        tokens.insert(0, Token::Uint(U256::from(keccak256(ty))));

        keccak256(encode(&tokens))
    }
}

/// A complete typed-data signing payload: domain, type definitions, the
/// primary type name and the message object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedData {
    /// Signing domain metadata
    pub domain: Eip712Domain,
    /// The custom types used by this message
    pub types: Types,
    /// The type of the message
    #[serde(rename = "primaryType")]
    pub primary_type: String,
    /// The message to be signed
    pub message: BTreeMap<String, serde_json::Value>,
}

// The payload may arrive JSON-stringified rather than as an object; both
// shapes deserialize to the same value.
impl<'de> Deserialize<'de> for TypedData {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TypedDataHelper {
            domain: Eip712Domain,
            types: Types,
            #[serde(rename = "primaryType")]
            primary_type: String,
            message: BTreeMap<String, serde_json::Value>,
        }

        impl From<TypedDataHelper> for TypedData {
            fn from(helper: TypedDataHelper) -> Self {
                let TypedDataHelper { domain, types, primary_type, message } = helper;
                TypedData { domain, types, primary_type, message }
            }
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ValOrString {
            Val(TypedDataHelper),
            String(String),
        }

        match ValOrString::deserialize(deserializer)? {
            ValOrString::Val(v) => Ok(v.into()),
            ValOrString::String(s) => {
                let helper: TypedDataHelper =
                    serde_json::from_str(&s).map_err(serde::de::Error::custom)?;
                Ok(helper.into())
            }
        }
    }
}

impl TypedData {
    /// Hashes the message object against its declared primary type.
    pub fn struct_hash(&self) -> Result<[u8; 32], Eip712Error> {
        let message =
            serde_json::Value::Object(serde_json::Map::from_iter(self.message.clone()));
        hash_struct(&self.primary_type, &message, &self.types)
    }

    /// The 32-byte digest a signer commits to: `0x1901`, the domain
    /// separator, then the struct hash (omitted when the primary type is the
    /// domain itself), hashed again.
    pub fn digest(&self) -> Result<[u8; 32], Eip712Error> {
        let domain_separator = self.domain.separator();
        let mut digest_input = [&[0x19, 0x01], &domain_separator[..]].concat();

        if self.primary_type != "EIP712Domain" {
            digest_input.extend(&self.struct_hash()?[..]);
        }
        Ok(keccak256(digest_input))
    }
}

/// Encodes an object by concatenating the hash of its encoded type with each
/// of its encoded members, each exactly 32 bytes.
pub fn encode_data(
    primary_type: &str,
    data: &serde_json::Value,
    types: &Types,
) -> Result<Vec<Token>, Eip712Error> {
    let hash = hash_type(primary_type, types)?;
    let mut tokens = vec![Token::Uint(U256::from(hash))];

    if let Some(fields) = types.get(primary_type) {
        for field in fields {
            if let Some(value) = data.get(&field.name) {
                tokens.push(encode_field(types, &field.name, &field.r#type, value)?);
            } else if types.contains_key(&field.r#type) {
                // missing recursive values hash as the zero word
                tokens.push(Token::Uint(U256::zero()));
            } else {
                return Err(Eip712Error::Message(format!(
                    "No data found for: `{}`",
                    field.name
                )))
            }
        }
    }

    Ok(tokens)
}

/// Hashes an object against `primary_type`.
pub fn hash_struct(
    primary_type: &str,
    data: &serde_json::Value,
    types: &Types,
) -> Result<[u8; 32], Eip712Error> {
    let tokens = encode_data(primary_type, data, types)?;
    Ok(keccak256(encode(&tokens)))
}

/// Returns the hash of the encoded type of `primary_type`.
pub fn hash_type(primary_type: &str, types: &Types) -> Result<[u8; 32], Eip712Error> {
    encode_type(primary_type, types).map(keccak256)
}

/// Encodes the type of an object: the primary type first, then every
/// transitively referenced struct type in alphabetical order.
pub fn encode_type(primary_type: &str, types: &Types) -> Result<String, Eip712Error> {
    let mut names = HashSet::new();
    find_type_dependencies(primary_type, types, &mut names);
    names.remove(primary_type);
    let mut deps: Vec<_> = names.into_iter().collect();
    deps.sort_unstable();
    deps.insert(0, primary_type);

    let mut res = String::new();
    for dep in deps {
        let fields = types.get(dep).ok_or_else(|| {
            Eip712Error::Message(format!("No type definition found for: `{dep}`"))
        })?;

        res += dep;
        res.push('(');
        res += &fields
            .iter()
            .map(|field| format!("{} {}", field.r#type, field.name))
            .collect::<Vec<_>>()
            .join(",");
        res.push(')');
    }
    Ok(res)
}

/// Collects all the custom types `primary_type` refers to.
fn find_type_dependencies<'a>(
    primary_type: &'a str,
    types: &'a Types,
    found: &mut HashSet<&'a str>,
) {
    if found.contains(primary_type) {
        return
    }
    if let Some(fields) = types.get(primary_type) {
        found.insert(primary_type);
        for field in fields {
            // strip the array tail before recursing
            let ty = field.r#type.split('[').next().unwrap_or(field.r#type.as_str());
            find_type_dependencies(ty, types, found);
        }
    }
}

/// Encodes a single field value as its 32-byte EIP-712 representation.
pub fn encode_field(
    types: &Types,
    field_name: &str,
    field_type: &str,
    value: &serde_json::Value,
) -> Result<Token, Eip712Error> {
    // custom struct types hash recursively
    if types.contains_key(field_type) {
        let tokens = encode_data(field_type, value, types)?;
        return Ok(encode_eip712_type(Token::Bytes(encode(&tokens).to_vec())))
    }

    let token = match field_type {
        s if s.contains('[') => {
            let stripped_type = match s.rsplit_once('[') {
                Some((stripped, _)) => stripped,
                None => s,
            };
            let values = value.as_array().ok_or_else(|| {
                Eip712Error::Message(format!("Expected array for type `{s}`, but got `{value}`"))
            })?;
            let tokens = values
                .iter()
                .map(|value| encode_field(types, field_name, stripped_type, value))
                .collect::<Result<Vec<_>, _>>()?;
            encode_eip712_type(Token::Bytes(encode(&tokens).to_vec()))
        }
        s => {
            let param = Reader::read(s)
                .map_err(|err| Eip712Error::Message(format!("Failed to parse type {s}: {err}")))?;

            match param {
                ParamType::Address => Token::Address(serde_json::from_value(value.clone())?),
                ParamType::Bytes => {
                    let data: Bytes = serde_json::from_value(value.clone())?;
                    encode_eip712_type(Token::Bytes(data.to_vec()))
                }
                ParamType::Int(_) => Token::Uint(serde_json::from_value(value.clone())?),
                ParamType::Uint(_) => {
                    // uints are commonly stringified by JavaScript tooling
                    let val: StringifiedNumeric = serde_json::from_value(value.clone())?;
                    let val = U256::try_from(val).map_err(|err| {
                        Eip712Error::Message(format!("Failed to parse uint {err}"))
                    })?;
                    Token::Uint(val)
                }
                ParamType::Bool => {
                    encode_eip712_type(Token::Bool(serde_json::from_value(value.clone())?))
                }
                ParamType::String => {
                    let s: String = serde_json::from_value(value.clone())?;
                    encode_eip712_type(Token::String(s))
                }
                ParamType::FixedBytes(_) => {
                    let data: Bytes = serde_json::from_value(value.clone())?;
                    encode_eip712_type(Token::FixedBytes(data.to_vec()))
                }
                other => {
                    return Err(Eip712Error::Message(format!(
                        "Unexpected type `{other}` for field `{field_name}`"
                    )))
                }
            }
        }
    };

    Ok(token)
}

/// Reduces a token to the 32-byte word EIP-712 encodes it as.
pub fn encode_eip712_type(token: Token) -> Token {
    match token {
        Token::Bytes(t) => Token::Uint(U256::from(keccak256(t))),
        Token::FixedBytes(t) => Token::Uint(U256::from(&t[..])),
        Token::String(t) => Token::Uint(U256::from(keccak256(t))),
        // booleans widen to uint256 0/1
        Token::Bool(t) => Token::Uint(U256::from(t as i32)),
        Token::Int(t) => Token::Uint(t),
        Token::Array(tokens) | Token::FixedArray(tokens) => Token::Uint(U256::from(keccak256(
            encode(&tokens.into_iter().map(encode_eip712_type).collect::<Vec<Token>>()),
        ))),
        token => token,
    }
}
