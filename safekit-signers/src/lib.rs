#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
//! # safekit-signers
//!
//! An EIP-1193-style provider surface backed by an asynchronous hardware
//! signing device.
//!
//! The [`SignerBridge`] owns one device session (current chain, current
//! account) and drives the device's action protocol, in which every operation
//! is an observable stream of status updates (see [`device`]). On top of it
//! the bridge exposes the standard request/response wallet methods (`eth_accounts`,
//! `eth_signTransaction`, `personal_sign`, typed-data signing, chain
//! switching) on top of it.
//!
//! ```no_run
//! # #[cfg(feature = "ledger")]
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! use safekit_signers::{ChainConfig, HttpFactory, LedgerDevice, SignerBridge};
//!
//! let chains = vec![ChainConfig {
//!     id: 1,
//!     label: "Ethereum".to_string(),
//!     rpc_url: "https://rpc.example.org".to_string(),
//! }];
//! let device = LedgerDevice::init().await?;
//! let bridge = SignerBridge::new(device, chains, HttpFactory)?;
//!
//! let accounts = bridge.get_accounts().await?;
//! println!("selected {}", accounts[0].address);
//! # Ok(())
//! # }
//! ```

mod bridge;
pub use bridge::{HttpFactory, ProviderFactory, SignerBridge};

mod chain;
pub use chain::{parse_chain_id, ChainConfig};

pub mod device;
pub use device::{wait_for_action, ActionStream, AddressOutput, DeviceActionState, DeviceActions};

mod error;
pub use error::{codes, BridgeError, DeviceError, ProviderRpcError};

mod events;
pub use events::BridgeEvent;

mod scan;
pub use scan::{AccountBalance, DerivationAccount, LEDGER_LEGACY_PATH, LEDGER_LIVE_PATH};

#[cfg(feature = "ledger")]
#[cfg_attr(docsrs, doc(cfg(feature = "ledger")))]
pub use device::ledger::LedgerDevice;
