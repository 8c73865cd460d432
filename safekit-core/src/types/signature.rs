use crate::types::U256;
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};
use thiserror::Error;

/// An error involving a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Invalid length, secp256k1 signatures are 65 bytes
    #[error("invalid signature length, got {0}, expected 65")]
    InvalidLength(usize),
    /// When parsing a signature from string to hex
    #[error(transparent)]
    DecodingError(#[from] hex::FromHexError),
}

/// An ECDSA signature as produced by a signing device.
///
/// The `v` value is carried exactly as the device returned it; use
/// [`normalize_v`] / [`to_eip155_v`] when a specific replay-protection
/// encoding is required.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    /// R value
    pub r: U256,
    /// S Value
    pub s: U256,
    /// V value
    pub v: u64,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sig = <[u8; 65]>::from(self);
        write!(f, "{}", hex::encode(&sig[..]))
    }
}

impl Signature {
    /// Builds a signature from a 64-byte `r || s` buffer and a recovery value,
    /// the layout signing devices respond with.
    pub fn from_raw_parts(v: u64, rs: &[u8]) -> Result<Self, SignatureError> {
        if rs.len() != 64 {
            return Err(SignatureError::InvalidLength(rs.len() + 1))
        }
        let r = U256::from_big_endian(&rs[..32]);
        let s = U256::from_big_endian(&rs[32..]);
        Ok(Self { r, s, v })
    }

    /// Copies the signature into the canonical 65-byte `r || s || v` layout.
    pub fn to_vec(&self) -> Vec<u8> {
        self.into()
    }
}

impl From<&Signature> for [u8; 65] {
    fn from(src: &Signature) -> [u8; 65] {
        let mut sig = [0u8; 65];
        src.r.to_big_endian(&mut sig[0..32]);
        src.s.to_big_endian(&mut sig[32..64]);
        // the `v` byte is truncated to the 'Electrum' range on purpose
        sig[64] = src.v as u8;
        sig
    }
}

impl From<Signature> for [u8; 65] {
    fn from(src: Signature) -> [u8; 65] {
        <[u8; 65]>::from(&src)
    }
}

impl From<&Signature> for Vec<u8> {
    fn from(src: &Signature) -> Vec<u8> {
        <[u8; 65]>::from(src).to_vec()
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = SignatureError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 65 {
            return Err(SignatureError::InvalidLength(bytes.len()))
        }
        let v = bytes[64];
        Signature::from_raw_parts(v as u64, &bytes[..64])
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        Signature::try_from(&bytes[..])
    }
}

/// Applies [EIP-155](https://eips.ethereum.org/EIPS/eip-155) replay
/// protection to a recovery parity bit.
pub fn to_eip155_v(parity: u64, chain_id: u64) -> u64 {
    parity + 35 + chain_id * 2
}

/// Reduces any of the `v` encodings in circulation (raw parity, 'Electrum'
/// 27/28, EIP-155) back down to a 0/1 parity bit.
pub fn normalize_v(v: u64) -> u64 {
    match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        v if v >= 35 => (v - 35) % 2,
        v => v % 2,
    }
}
