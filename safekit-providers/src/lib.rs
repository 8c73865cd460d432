#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
//! # safekit-providers
//!
//! Asynchronous JSON-RPC clients for the handful of chain reads this
//! workspace needs, plus the deterministic counterfactual address predictor.
//!
//! A [`Provider`] is instantiated with a data transport implementing the
//! [`JsonRpcClient`] trait (HTTP in production, [`MockProvider`] in tests):
//!
//! ```no_run
//! use safekit_providers::{Http, Provider};
//! use std::convert::TryFrom;
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Provider::<Http>::try_from("http://localhost:8545")?;
//! let chain_id = provider.get_chainid().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

mod transports;
pub use transports::{ClientError, Http, JsonRpcError, MockError, MockProvider, MockResponse};

mod provider;
pub use provider::{Provider, ProviderError};

mod factory;
pub use factory::CreationCodeCache;

mod predict;
pub use predict::AddressPredictor;

/// Trait which must be implemented by data transports to be used with the
/// Ethereum JSON-RPC API.
#[async_trait]
pub trait JsonRpcClient: Debug + Send + Sync {
    /// A transport-specific error
    type Error: std::error::Error + Into<ProviderError> + Send + Sync;

    /// Sends a request with the provided JSON-RPC method and parameters.
    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, Self::Error>
    where
        T: Debug + Serialize + Send + Sync,
        R: DeserializeOwned;
}
