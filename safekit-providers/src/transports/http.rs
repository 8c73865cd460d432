use super::common::{JsonRpcError, Request, Response};
use crate::{provider::ProviderError, JsonRpcClient};

use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fmt::Debug,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// A low-level JSON-RPC Client over HTTP.
///
/// # Example
///
/// ```no_run
/// use safekit_core::types::U64;
/// use safekit_providers::{Http, JsonRpcClient};
/// use std::str::FromStr;
///
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Http::from_str("http://localhost:8545")?;
/// let block_number: U64 = provider.request("eth_blockNumber", ()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Http {
    id: AtomicU64,
    client: Client,
    url: Url,
}

impl Debug for Http {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Http {{ id: {:?}, url: {} }}", self.id, self.url)
    }
}

/// Error thrown when sending an HTTP request
#[derive(Error, Debug)]
pub enum ClientError {
    /// Thrown if the request failed
    #[error(transparent)]
    ReqwestError(#[from] ReqwestError),

    /// Thrown if the node responded with a JSON-RPC error
    #[error(transparent)]
    JsonRpcError(#[from] JsonRpcError),

    /// Thrown if the response could not be parsed
    #[error("Deserialization Error: {err}. Response: {text}")]
    SerdeJson {
        /// The underlying serde error
        err: serde_json::Error,
        /// The raw response text
        text: String,
    },
}

impl From<ClientError> for ProviderError {
    fn from(src: ClientError) -> Self {
        match src {
            ClientError::ReqwestError(err) => ProviderError::HTTPError(err),
            _ => ProviderError::JsonRpcClientError(Box::new(src)),
        }
    }
}

#[async_trait]
impl JsonRpcClient for Http {
    type Error = ClientError;

    /// Sends a POST request with the provided method and the params serialized
    /// as JSON over HTTP
    async fn request<T: Debug + Serialize + Send + Sync, R: DeserializeOwned>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, ClientError> {
        let next_id = self.id.fetch_add(1, Ordering::SeqCst);
        let payload = Request::new(next_id, method, params);
        debug!(id = next_id, method, "sending request");

        let res = self.client.post(self.url.as_ref()).json(&payload).send().await?;
        let text = res.text().await?;

        let response: Response<R> = serde_json::from_str(&text)
            .map_err(|err| ClientError::SerdeJson { err, text: text.clone() })?;

        Ok(response.data.into_result()?)
    }
}

impl Http {
    /// Initializes a new HTTP Client
    ///
    /// # Example
    ///
    /// ```
    /// use safekit_providers::Http;
    /// use url::Url;
    ///
    /// let url = Url::parse("http://localhost:8545").unwrap();
    /// let provider = Http::new(url);
    /// ```
    pub fn new(url: impl Into<Url>) -> Self {
        Self::new_with_client(url, Client::new())
    }

    /// Initializes a new HTTP Client with an existing reqwest client, allowing
    /// connection-pool reuse
    pub fn new_with_client(url: impl Into<Url>, client: Client) -> Self {
        Self { id: AtomicU64::new(0), client, url: url.into() }
    }

    /// The Url to which requests are made
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl FromStr for Http {
    type Err = url::ParseError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(src)?;
        Ok(Http::new(url))
    }
}

impl Clone for Http {
    fn clone(&self) -> Self {
        Self {
            id: AtomicU64::new(self.id.load(Ordering::SeqCst)),
            client: self.client.clone(),
            url: self.url.clone(),
        }
    }
}
