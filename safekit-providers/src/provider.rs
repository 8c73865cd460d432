use crate::{Http, JsonRpcClient, MockProvider};

use safekit_core::{
    types::{Address, BlockNumber, Bytes, TxHash, U256},
    utils,
};

use serde::{de::DeserializeOwned, Serialize};
use std::{convert::TryFrom, fmt::Debug};
use thiserror::Error;
use tracing::debug;

/// An abstract provider for the read and submit calls this workspace needs.
/// Must be instantiated with a data transport which implements the
/// [`JsonRpcClient`] trait (e.g. [`Http`], [`MockProvider`]).
///
/// Failures surface as [`ProviderError`]; nothing is retried internally.
#[derive(Clone, Debug)]
pub struct Provider<P> {
    inner: P,
}

/// An error thrown when making a call to the provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An internal error in the JSON RPC Client
    #[error(transparent)]
    JsonRpcClientError(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// An error during transport
    #[error(transparent)]
    HTTPError(#[from] reqwest::Error),

    /// A contract call returned data that does not decode as declared
    #[error(transparent)]
    AbiError(#[from] safekit_core::ethabi::Error),

    /// A value did not fit the expected representation
    #[error("custom error: {0}")]
    CustomError(String),
}

impl<P: JsonRpcClient> Provider<P> {
    /// Instantiate a new provider with a backend.
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying transport.
    pub fn as_ref(&self) -> &P {
        &self.inner
    }

    /// Sends a raw request, deserializing the response. Used for methods the
    /// bridge does not intercept.
    pub async fn request<T, R>(&self, method: &str, params: T) -> Result<R, ProviderError>
    where
        T: Debug + Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        debug!(method, ?params, "provider request");
        self.inner.request(method, params).await.map_err(Into::into)
    }

    /// Gets the chain id via the `eth_chainId` API.
    pub async fn get_chainid(&self) -> Result<U256, ProviderError> {
        self.request("eth_chainId", ()).await
    }

    /// Gets the balance of `from` at the latest block.
    pub async fn get_balance(&self, from: Address) -> Result<U256, ProviderError> {
        let from = utils::serialize(&from);
        let block = utils::serialize(&BlockNumber::Latest);
        self.request("eth_getBalance", [from, block]).await
    }

    /// Gets the transaction count of `from` at the given block; pass
    /// [`BlockNumber::Pending`] to account for unconfirmed transactions.
    pub async fn get_transaction_count(
        &self,
        from: Address,
        block: Option<BlockNumber>,
    ) -> Result<U256, ProviderError> {
        let from = utils::serialize(&from);
        let block = utils::serialize(&block.unwrap_or(BlockNumber::Latest));
        self.request("eth_getTransactionCount", [from, block]).await
    }

    /// Performs a read-only `eth_call` of `data` against the contract at `to`.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ProviderError> {
        #[derive(Debug, Serialize)]
        struct CallRequest {
            to: Address,
            data: Bytes,
        }
        let tx = utils::serialize(&CallRequest { to, data });
        let block = utils::serialize(&BlockNumber::Latest);
        self.request("eth_call", [tx, block]).await
    }

    /// Broadcasts a signed raw transaction, returning its hash.
    pub async fn send_raw_transaction(&self, tx: Bytes) -> Result<TxHash, ProviderError> {
        let tx = utils::serialize(&tx);
        self.request("eth_sendRawTransaction", [tx]).await
    }
}

impl Provider<MockProvider> {
    /// Returns a `Provider` instantiated with an internal "mock" transport.
    ///
    /// # Example
    ///
    /// ```
    /// # use safekit_core::types::U256;
    /// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
    /// use safekit_providers::Provider;
    ///
    /// let (provider, mock) = Provider::mocked();
    /// mock.push(U256::from(5u64))?;
    /// let chain_id = provider.get_chainid().await?;
    /// assert_eq!(chain_id, 5.into());
    /// # Ok(())
    /// # }
    /// ```
    pub fn mocked() -> (Self, MockProvider) {
        let mock = MockProvider::new();
        let mock_clone = mock.clone();
        (Self::new(mock), mock_clone)
    }
}

impl TryFrom<&str> for Provider<Http> {
    type Error = url::ParseError;

    fn try_from(src: &str) -> Result<Self, Self::Error> {
        Ok(Provider::new(src.parse::<Http>()?))
    }
}

impl TryFrom<String> for Provider<Http> {
    type Error = url::ParseError;

    fn try_from(src: String) -> Result<Self, Self::Error> {
        Provider::try_from(src.as_str())
    }
}
