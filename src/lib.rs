#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
//! # safekit
//!
//! A toolkit for proxy-based smart accounts: deterministic counterfactual
//! address prediction, multi-chain setup reconciliation, and an EIP-1193-style
//! hardware-wallet signing bridge.
//!
//! ## Predicting a counterfactual account address
//!
//! ```no_run
//! use safekit::core::types::{Bytes, ProxyCreationParams, U256};
//! use safekit::providers::{AddressPredictor, Http, Provider};
//! use std::convert::TryFrom;
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Provider::<Http>::try_from("https://rpc.example.org")?;
//! let predictor = AddressPredictor::new();
//!
//! let params = ProxyCreationParams {
//!     singleton: "0xd9Db270c1B5E3Bd161E8c8503c55cEABeE709552".parse()?,
//!     initializer: "0xb63e800d".parse::<Bytes>()?,
//!     salt_nonce: U256::zero(),
//!     factory: "0xa6B71E26C5e0845f74c812102Ca7114b6a896AB2".parse()?,
//! };
//! let address = predictor.predict(&params, &provider).await?;
//! println!("will deploy at {address:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Signing with a hardware wallet
//!
//! ```no_run
//! # #[cfg(feature = "ledger")]
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! use safekit::signers::{ChainConfig, HttpFactory, LedgerDevice, SignerBridge};
//!
//! let chains = vec![ChainConfig {
//!     id: 1,
//!     label: "Ethereum".to_string(),
//!     rpc_url: "https://rpc.example.org".to_string(),
//! }];
//! let bridge = SignerBridge::new(LedgerDevice::init().await?, chains, HttpFactory)?;
//! let accounts = bridge.get_accounts().await?;
//! # Ok(())
//! # }
//! ```

/// Data types, hashing and deterministic-address computation.
pub use safekit_core as core;

/// JSON-RPC clients and the address predictor.
pub use safekit_providers as providers;

/// The hardware-wallet signing bridge.
pub use safekit_signers as signers;

/// Easy imports of frequently used types.
pub mod prelude {
    pub use super::core::{
        multichain::*,
        setup::encode_setup_call,
        types::*,
        utils::{get_create2_address, keccak256},
    };
    pub use super::providers::{AddressPredictor, Http, JsonRpcClient, Provider, ProviderError};
    pub use super::signers::{
        BridgeError, BridgeEvent, ChainConfig, DeviceActions, HttpFactory, SignerBridge,
    };
}
