//! Deterministic counterfactual address prediction for proxy accounts.

use crate::{factory::CreationCodeCache, JsonRpcClient, Provider, ProviderError};
use safekit_core::{
    setup::encode_setup_call,
    types::{AccountCreationConfig, Address, ProxyCreationParams},
    utils::{get_create2_address, proxy_init_code, proxy_salt},
};

/// Predicts the on-chain address of a not-yet-deployed proxy account.
///
/// The prediction is a pure function of its inputs except for one chain read,
/// the factory's proxy creation code, which is memoized per
/// `(factory, chain id)` for the lifetime of the predictor. Keep one
/// predictor around for the lifetime of the process.
///
/// ```no_run
/// # use safekit_core::types::ProxyCreationParams;
/// # use safekit_providers::{AddressPredictor, Http, Provider};
/// # use std::convert::TryFrom;
/// # async fn foo(params: ProxyCreationParams) -> Result<(), Box<dyn std::error::Error>> {
/// let provider = Provider::<Http>::try_from("http://localhost:8545")?;
/// let predictor = AddressPredictor::new();
/// let address = predictor.predict(&params, &provider).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct AddressPredictor {
    code_cache: CreationCodeCache,
}

impl AddressPredictor {
    /// Creates a predictor with an empty creation-code cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the address the factory will deploy a proxy at for the given
    /// parameters.
    ///
    /// The derivation chain mirrors the factory contract:
    /// 1. hash the initializer,
    /// 2. salt = `keccak256(initializer_hash ++ salt_nonce)`,
    /// 3. init code = creation code ++ singleton (one cached chain read),
    /// 4. CREATE2 over `(factory, salt, keccak256(init_code))`.
    ///
    /// Fails with [`ProviderError`] if the chain read fails; the call is not
    /// retried here.
    pub async fn predict<P: JsonRpcClient>(
        &self,
        params: &ProxyCreationParams,
        provider: &Provider<P>,
    ) -> Result<Address, ProviderError> {
        let salt = proxy_salt(&params.initializer, params.salt_nonce);

        let creation_code = self.code_cache.creation_code(params.factory, provider).await?;
        let init_code = proxy_init_code(creation_code, params.singleton);

        Ok(get_create2_address(params.factory, salt, init_code))
    }

    /// Predicts the address of the same logical account when redeployed with
    /// identical parameters on another chain: re-encodes the stored
    /// configuration into the initializer produced at original deployment
    /// time and delegates to [`AddressPredictor::predict`].
    pub async fn predict_from_replay<P: JsonRpcClient>(
        &self,
        config: &AccountCreationConfig,
        provider: &Provider<P>,
    ) -> Result<Address, ProviderError> {
        let initializer = encode_setup_call(&config.setup);
        let params = ProxyCreationParams {
            singleton: config.singleton,
            initializer,
            salt_nonce: config.salt_nonce,
            factory: config.factory_address,
        };
        self.predict(&params, provider).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safekit_core::{
        ethabi::{self, Token},
        types::{Bytes, SetupConfig, U256},
        utils::keccak256,
    };

    fn factory() -> Address {
        "0xa6B71E26C5e0845f74c812102Ca7114b6a896AB2".parse().unwrap()
    }

    fn singleton() -> Address {
        "0xd9Db270c1B5E3Bd161E8c8503c55cEABeE709552".parse().unwrap()
    }

    fn creation_code() -> Vec<u8> {
        hex::decode("608060405234801561001057600080fd5b50").unwrap()
    }

    fn params(salt_nonce: u64) -> ProxyCreationParams {
        ProxyCreationParams {
            singleton: singleton(),
            initializer: Bytes::from(vec![0x00]),
            salt_nonce: U256::from(salt_nonce),
            factory: factory(),
        }
    }

    fn push_code(mock: &crate::MockProvider, chain_id: u64, code: &[u8]) {
        mock.push(Bytes::from(ethabi::encode(&[Token::Bytes(code.to_vec())]))).unwrap();
        mock.push(U256::from(chain_id)).unwrap();
    }

    fn push_chain_id(mock: &crate::MockProvider, chain_id: u64) {
        mock.push(U256::from(chain_id)).unwrap();
    }

    #[tokio::test]
    async fn prediction_is_deterministic() {
        let predictor = AddressPredictor::new();
        let (provider, mock) = Provider::mocked();

        push_code(&mock, 1, &creation_code());
        let first = predictor.predict(&params(0), &provider).await.unwrap();

        // the second prediction reuses the cached creation code
        push_chain_id(&mock, 1);
        let second = predictor.predict(&params(0), &provider).await.unwrap();
        assert_eq!(first, second);

        // and matches the formula applied by hand
        let salt = proxy_salt([0x00], U256::zero());
        let init_code = proxy_init_code(creation_code(), singleton());
        assert_eq!(first, get_create2_address(factory(), salt, init_code));
    }

    #[tokio::test]
    async fn prediction_is_input_sensitive() {
        let predictor = AddressPredictor::new();
        let (provider, mock) = Provider::mocked();

        push_code(&mock, 1, &creation_code());
        let base = predictor.predict(&params(0), &provider).await.unwrap();

        push_chain_id(&mock, 1);
        let other_nonce = predictor.predict(&params(1), &provider).await.unwrap();
        assert_ne!(base, other_nonce);

        push_chain_id(&mock, 1);
        let mut changed = params(0);
        changed.initializer = Bytes::from(vec![0x01]);
        let other_initializer = predictor.predict(&changed, &provider).await.unwrap();
        assert_ne!(base, other_initializer);

        push_chain_id(&mock, 1);
        let mut changed = params(0);
        changed.singleton = Address::from_low_u64_be(0xdead);
        let other_singleton = predictor.predict(&changed, &provider).await.unwrap();
        assert_ne!(base, other_singleton);
    }

    #[tokio::test]
    async fn different_chains_do_not_share_bytecode() {
        let predictor = AddressPredictor::new();
        let (provider, mock) = Provider::mocked();

        push_code(&mock, 1, &creation_code());
        let mainnet = predictor.predict(&params(0), &provider).await.unwrap();

        // same factory address, different chain, different deployed bytecode
        push_code(&mock, 10, &hex::decode("6080604052600080fd").unwrap());
        let other_chain = predictor.predict(&params(0), &provider).await.unwrap();
        assert_ne!(mainnet, other_chain);
    }

    #[tokio::test]
    async fn replay_prediction_reencodes_the_initializer() {
        let predictor = AddressPredictor::new();
        let (provider, mock) = Provider::mocked();

        let config = AccountCreationConfig {
            setup: SetupConfig {
                owners: vec![Address::from_low_u64_be(1), Address::from_low_u64_be(2)],
                threshold: U256::from(2u64),
                ..Default::default()
            },
            factory_address: factory(),
            singleton: singleton(),
            salt_nonce: U256::from(3u64),
        };

        push_code(&mock, 1, &creation_code());
        let replayed = predictor.predict_from_replay(&config, &provider).await.unwrap();

        push_chain_id(&mock, 1);
        let by_hand = predictor
            .predict(
                &ProxyCreationParams {
                    singleton: singleton(),
                    initializer: encode_setup_call(&config.setup),
                    salt_nonce: U256::from(3u64),
                    factory: factory(),
                },
                &provider,
            )
            .await
            .unwrap();
        assert_eq!(replayed, by_hand);

        // a different owner set deploys elsewhere
        push_chain_id(&mock, 1);
        let mut other = config;
        other.setup.owners.push(Address::from_low_u64_be(3));
        let other = predictor.predict_from_replay(&other, &provider).await.unwrap();
        assert_ne!(replayed, other);
    }

    #[tokio::test]
    async fn chain_read_failures_surface_unretried() {
        let predictor = AddressPredictor::new();
        let (provider, mock) = Provider::mocked();

        // the eth_call fails after the chain id resolves
        push_chain_id(&mock, 1);
        predictor.predict(&params(0), &provider).await.unwrap_err();

        // exactly one chain id request and one failed call were issued
        mock.assert_request("eth_chainId", ()).unwrap();
        assert!(matches!(
            mock.request::<_, ()>("noop", ()).await.unwrap_err(),
            crate::MockError::EmptyResponses
        ));
    }

    #[test]
    fn sanity_keccak_of_empty_initializer() {
        // keccak256("") is the well-known empty hash; the salt derivation
        // must not confuse it with hashing the nonce into the tuple
        assert_eq!(
            hex::encode(keccak256([])),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
