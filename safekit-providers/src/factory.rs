//! Retrieval and caching of the proxy factory's creation code.

use crate::{JsonRpcClient, Provider, ProviderError};
use safekit_core::{
    ethabi::{self, ParamType, Token},
    types::{Address, Bytes, U256},
    utils::id,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::OnceCell;
use tracing::debug;

/// Builds the `proxyCreationCode()` call data.
fn creation_code_call() -> Bytes {
    id("proxyCreationCode()").to_vec().into()
}

/// Memoizing store for factory creation code, keyed by
/// `(factory address, chain id)`.
///
/// The chain id is part of the key on purpose: the same transport value can
/// point at different chains over its lifetime, and factory bytecode is only
/// immutable per chain. Concurrent requests for the same key share one
/// in-flight fetch; only successful results are retained, so a failed fetch
/// is retried by the next caller.
#[derive(Debug, Default)]
pub struct CreationCodeCache {
    cells: Mutex<HashMap<(Address, u64), Arc<OnceCell<Bytes>>>>,
}

impl CreationCodeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the factory's proxy creation code, fetching it through
    /// `provider` on first use.
    pub async fn creation_code<P: JsonRpcClient>(
        &self,
        factory: Address,
        provider: &Provider<P>,
    ) -> Result<Bytes, ProviderError> {
        let chain_id = provider.get_chainid().await?;
        if chain_id > U256::from(u64::MAX) {
            return Err(ProviderError::CustomError(format!(
                "chain id {chain_id} does not fit the cache key"
            )))
        }
        let chain_id = chain_id.as_u64();

        let cell = {
            let mut cells = self.cells.lock().unwrap();
            cells.entry((factory, chain_id)).or_default().clone()
        };

        cell.get_or_try_init(|| async {
            debug!(factory = ?factory, chain_id, "fetching proxy creation code");
            let raw = provider.call(factory, creation_code_call()).await?;
            decode_creation_code(&raw)
        })
        .await
        .map(Clone::clone)
    }
}

/// The call returns a single ABI-encoded `bytes` value.
fn decode_creation_code(raw: &Bytes) -> Result<Bytes, ProviderError> {
    let mut tokens = ethabi::decode(&[ParamType::Bytes], raw.as_ref())?;
    match tokens.pop() {
        Some(Token::Bytes(code)) => Ok(code.into()),
        _ => Err(ProviderError::CustomError(
            "proxyCreationCode() did not return bytes".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(code: &[u8]) -> Bytes {
        ethabi::encode(&[Token::Bytes(code.to_vec())]).into()
    }

    #[tokio::test]
    async fn caches_per_factory_and_chain() {
        let cache = CreationCodeCache::new();
        let (provider, mock) = Provider::mocked();
        let factory: Address = "0xa6B71E26C5e0845f74c812102Ca7114b6a896AB2".parse().unwrap();

        // responses pop LIFO: chain id is requested first on every call
        mock.push(encoded(&[0xde, 0xad])).unwrap();
        mock.push(U256::from(1u64)).unwrap();
        let code = cache.creation_code(factory, &provider).await.unwrap();
        assert_eq!(code.as_ref(), [0xde, 0xad]);

        // second hit on the same chain: only the chain id is requested
        mock.push(U256::from(1u64)).unwrap();
        let code = cache.creation_code(factory, &provider).await.unwrap();
        assert_eq!(code.as_ref(), [0xde, 0xad]);

        // a different chain id must not share the cached value
        mock.push(encoded(&[0xbe, 0xef])).unwrap();
        mock.push(U256::from(5u64)).unwrap();
        let code = cache.creation_code(factory, &provider).await.unwrap();
        assert_eq!(code.as_ref(), [0xbe, 0xef]);

        mock.assert_request("eth_chainId", ()).unwrap();
        mock.assert_request(
            "eth_call",
            serde_json::json!([
                { "to": factory, "data": creation_code_call() },
                "latest"
            ]),
        )
        .unwrap();
        mock.assert_request("eth_chainId", ()).unwrap();
        mock.assert_request("eth_chainId", ()).unwrap();
        // the second fetch belongs to chain 5
        mock.assert_request(
            "eth_call",
            serde_json::json!([
                { "to": factory, "data": creation_code_call() },
                "latest"
            ]),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn failed_fetches_are_not_cached() {
        let cache = CreationCodeCache::new();
        let (provider, mock) = Provider::mocked();
        let factory: Address = "0xa6B71E26C5e0845f74c812102Ca7114b6a896AB2".parse().unwrap();

        // chain id resolves, the call itself fails
        mock.push(U256::from(1u64)).unwrap();
        cache.creation_code(factory, &provider).await.unwrap_err();

        // the next caller retries and succeeds
        mock.push(encoded(&[0x60, 0x80])).unwrap();
        mock.push(U256::from(1u64)).unwrap();
        let code = cache.creation_code(factory, &provider).await.unwrap();
        assert_eq!(code.as_ref(), [0x60, 0x80]);
    }
}
