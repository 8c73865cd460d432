#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
//! # safekit-core
//!
//! Data types, hashing and deterministic-address computation for proxy-based
//! smart accounts.
//!
//! This crate is purely computational: it performs no I/O. It provides
//!
//! - the Ethereum primitive types used across the workspace ([`types`]),
//! - keccak-256 hashing and the CREATE2 address formula ([`utils`]),
//! - the proxy `setup` initializer encoding ([`setup`]),
//! - multi-chain owner/threshold reconciliation ([`multichain`]),
//! - dynamic [EIP-712](https://eips.ethereum.org/EIPS/eip-712) typed-data
//!   hashing ([`eip712`]).

pub mod eip712;
pub mod multichain;
pub mod setup;
pub mod types;
pub mod utils;

/// Re-export of the ABI encoder this crate builds on.
pub use ethabi;
