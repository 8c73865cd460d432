//! The EIP-1193-style provider surface over an asynchronous signing device.

use crate::{
    chain::{parse_chain_id, ChainConfig},
    device::{wait_for_action, DeviceActions},
    error::{codes, BridgeError, ProviderRpcError},
    events::{BridgeEvent, EventBus},
    scan::{self, DerivationAccount, LEDGER_LIVE_PATH},
};
use futures_channel::mpsc::UnboundedReceiver;
use safekit_core::{
    eip712::TypedData,
    types::{BlockNumber, Bytes, Signature, TransactionParams, TxHash, UnsignedTransaction},
    utils,
};
use safekit_providers::{Http, JsonRpcClient, Provider};
use serde::Deserialize;
use serde_json::Value;
use std::{convert::TryFrom, sync::Mutex};
use tracing::debug;

/// Builds the JSON-RPC provider for a chain. Production code uses
/// [`HttpFactory`]; tests substitute a mock transport.
pub trait ProviderFactory: Send + Sync {
    /// The transport the factory produces
    type Client: JsonRpcClient;

    /// Returns a provider speaking to `chain`.
    fn provider_for(&self, chain: &ChainConfig) -> Result<Provider<Self::Client>, BridgeError>;
}

/// JSON-RPC over HTTP at the chain's configured endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpFactory;

impl ProviderFactory for HttpFactory {
    type Client = Http;

    fn provider_for(&self, chain: &ChainConfig) -> Result<Provider<Http>, BridgeError> {
        Provider::try_from(chain.rpc_url.as_str()).map_err(|_| {
            ProviderRpcError::new(
                codes::UNRECOGNIZED_CHAIN_ID,
                format!("No RPC found for chain ID: {}", chain.hex_id()),
            )
            .into()
        })
    }
}

/// The single mutable resource of a bridge: which chain and account the
/// session is on. Owned exclusively by the bridge, mutated only through its
/// handlers.
#[derive(Debug)]
struct Session {
    /// Index into the configured chain list
    current_chain: usize,
    current_account: Option<DerivationAccount>,
}

/// Bridges an asynchronous hardware signing device to the standard
/// request/response provider interface.
///
/// One bridge instance owns one device session. Concurrent signing requests
/// against the same session are a caller error; callers serialize, e.g. with
/// an in-flight flag.
#[derive(Debug)]
pub struct SignerBridge<D, F: ProviderFactory> {
    device: D,
    chains: Vec<ChainConfig>,
    provider_factory: F,
    session: Mutex<Session>,
    events: EventBus,
    asset: String,
}

impl<D, F> SignerBridge<D, F>
where
    D: DeviceActions,
    F: ProviderFactory,
{
    /// Creates a bridge over `device`. The first entry of `chains` is the
    /// default chain of the session.
    pub fn new(device: D, chains: Vec<ChainConfig>, provider_factory: F) -> Result<Self, BridgeError> {
        if chains.is_empty() {
            return Err(ProviderRpcError::new(
                codes::INTERNAL_ERROR,
                "at least one chain must be configured",
            )
            .into())
        }
        Ok(Self {
            device,
            chains,
            provider_factory,
            session: Mutex::new(Session { current_chain: 0, current_account: None }),
            events: EventBus::new(),
            asset: "ETH".to_string(),
        })
    }

    /// Subscribes to account and chain change notifications.
    pub fn subscribe(&self) -> UnboundedReceiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// The chain the session currently operates on.
    pub fn current_chain(&self) -> ChainConfig {
        let session = self.session.lock().unwrap();
        self.chains[session.current_chain].clone()
    }

    /// The account signing requests are routed to, if one was selected.
    pub fn current_account(&self) -> Option<DerivationAccount> {
        self.session.lock().unwrap().current_account.clone()
    }

    // Sets the current chain and emits the chainChanged event
    fn set_current_chain(&self, chain_id: u64) -> Result<ChainConfig, BridgeError> {
        let position =
            self.chains.iter().position(|chain| chain.id == chain_id).ok_or_else(|| {
                ProviderRpcError::new(
                    codes::UNRECOGNIZED_CHAIN_ID,
                    format!("Unrecognized chain ID: 0x{chain_id:x}"),
                )
            })?;
        self.session.lock().unwrap().current_chain = position;
        self.events.emit(BridgeEvent::ChainChanged(chain_id));
        Ok(self.chains[position].clone())
    }

    // Sets the current account and emits the accountsChanged event
    fn set_current_account(&self, account: DerivationAccount) {
        let address = account.address;
        self.session.lock().unwrap().current_account = Some(account);
        self.events.emit(BridgeEvent::AccountsChanged(vec![address]));
    }

    // Clears the current account and emits the accountsChanged event
    fn clear_current_account(&self) {
        self.session.lock().unwrap().current_account = None;
        self.events.emit(BridgeEvent::AccountsChanged(Vec::new()));
    }

    // Resets the current chain to the default and emits the chainChanged event
    fn clear_current_chain(&self) {
        self.session.lock().unwrap().current_chain = 0;
        self.events.emit(BridgeEvent::ChainChanged(self.chains[0].id));
    }

    // The derivation path signing requests are routed to
    fn asserted_derivation_path(&self) -> Result<String, BridgeError> {
        self.session
            .lock()
            .unwrap()
            .current_account
            .as_ref()
            .map(|account| account.derivation_path.clone())
            .ok_or_else(|| {
                ProviderRpcError::new(codes::INTERNAL_ERROR, "No derivation path found").into()
            })
    }

    fn rpc_provider(&self) -> Result<Provider<F::Client>, BridgeError> {
        self.provider_factory.provider_for(&self.current_chain())
    }

    /// Scans the device for accounts on the current chain and makes the first
    /// one current.
    pub async fn get_accounts(&self) -> Result<Vec<DerivationAccount>, BridgeError> {
        let chain = self.current_chain();
        let accounts = self.derive_accounts(chain.id, None, None).await?;

        if let Some(first) = accounts.first() {
            self.set_current_account(first.clone());
        }

        Ok(accounts)
    }

    /// Derives accounts for selection, switching the session to `chain_id`
    /// first.
    ///
    /// A custom `derivation_path` yields exactly the one account at that
    /// path. The two recognized scan roots ([`LEDGER_LIVE_PATH`] and
    /// [`crate::LEDGER_LEGACY_PATH`], also the default when no path is given)
    /// scan sequential indices and stop after 5 consecutive zero-balance
    /// accounts, resetting the count at every funded account.
    pub async fn derive_accounts(
        &self,
        chain_id: u64,
        derivation_path: Option<&str>,
        asset: Option<&str>,
    ) -> Result<Vec<DerivationAccount>, BridgeError> {
        let chain = self.set_current_chain(chain_id)?;
        let provider = self.provider_factory.provider_for(&chain)?;
        let asset = asset.unwrap_or(&self.asset);

        match derivation_path {
            Some(path) if !scan::is_default_base_path(path) => Ok(vec![
                scan::derive_account(&self.device, &provider, path.to_string(), asset).await?,
            ]),
            Some(base_path) => {
                scan::scan_accounts(&self.device, &provider, base_path, asset).await
            }
            None => scan::scan_accounts(&self.device, &provider, LEDGER_LIVE_PATH, asset).await,
        }
    }

    /// Builds, signs and serializes a transaction for the current account.
    ///
    /// The nonce comes from the request or, when absent, from the pending
    /// transaction count so unconfirmed prior transactions are accounted for.
    pub async fn sign_transaction(&self, params: TransactionParams) -> Result<Bytes, BridgeError> {
        let account = self.current_account().ok_or_else(|| {
            ProviderRpcError::new(codes::INTERNAL_ERROR, "No derivation path found")
        })?;
        let (derivation_path, from) = (account.derivation_path, account.address);
        let chain = self.current_chain();

        let nonce = match params.nonce {
            Some(nonce) => nonce,
            None => {
                let provider = self.rpc_provider()?;
                provider.get_transaction_count(from, Some(BlockNumber::Pending)).await?
            }
        };

        let transaction = UnsignedTransaction::new(params, chain.id, nonce);
        let unsigned = transaction.rlp_unsigned();

        let signature =
            wait_for_action(self.device.sign_transaction(&derivation_path, unsigned.as_ref()))
                .await?;

        Ok(transaction.rlp_signed(&signature))
    }

    /// Signs and broadcasts, returning the transaction hash.
    pub async fn send_transaction(&self, params: TransactionParams) -> Result<TxHash, BridgeError> {
        let signed = self.sign_transaction(params).await?;
        let provider = self.rpc_provider()?;
        Ok(provider.send_raw_transaction(signed).await?)
    }

    /// Signs `message` with the current account's key.
    ///
    /// The message is signed exactly as provided: hex strings are not
    /// re-encoded into raw bytes, so the on-device confirmation shows plain
    /// hex (e.g. `0xdeadbeef`) instead of unreadable byte notation.
    pub async fn sign_message(&self, message: &str) -> Result<Signature, BridgeError> {
        let derivation_path = self.asserted_derivation_path()?;
        wait_for_action(self.device.sign_message(&derivation_path, message.as_bytes())).await
    }

    /// Signs a typed-data payload with the current account's key. All
    /// `eth_signTypedData` variants funnel through this one device call.
    pub async fn sign_typed_data(&self, payload: &Value) -> Result<Signature, BridgeError> {
        let typed_data: TypedData = serde_json::from_value(payload.clone())?;
        let derivation_path = self.asserted_derivation_path()?;
        wait_for_action(self.device.sign_typed_data(&derivation_path, &typed_data)).await
    }

    /// Switches the session to `chain_id` if it is a configured chain.
    pub async fn switch_chain(&self, chain_id: u64) -> Result<(), BridgeError> {
        self.set_current_chain(chain_id).map(drop)
    }

    /// Tears down the device session: the current account is cleared (an
    /// empty `accountsChanged` fires) and the chain resets to the default.
    pub async fn disconnect(&self) -> Result<(), BridgeError> {
        self.device.disconnect().await.map_err(BridgeError::from_device)?;
        self.clear_current_account();
        self.clear_current_chain();
        Ok(())
    }

    /// Dispatches an EIP-1193-style request: positional JSON parameters in,
    /// JSON result out. Methods the bridge does not handle pass through to
    /// the current chain's RPC.
    pub async fn request(&self, method: &str, params: &[Value]) -> Result<Value, BridgeError> {
        debug!(method, "bridge request");
        match method {
            "eth_requestAccounts" => {
                let accounts = self.get_accounts().await?;
                let first = accounts.first().ok_or_else(|| {
                    ProviderRpcError::new(codes::INTERNAL_ERROR, "no accounts derived")
                })?;
                Ok(Value::Array(vec![utils::serialize(&first.address)]))
            }
            "eth_accounts" => {
                let accounts = match self.current_account() {
                    Some(account) => vec![utils::serialize(&account.address)],
                    None => Vec::new(),
                };
                Ok(Value::Array(accounts))
            }
            "eth_chainId" => Ok(Value::String(self.current_chain().hex_id())),
            "eth_signTransaction" => {
                let params: TransactionParams = object_param(params, 0)?;
                let signed = self.sign_transaction(params).await?;
                Ok(utils::serialize(&signed))
            }
            "eth_sendTransaction" => {
                let params: TransactionParams = object_param(params, 0)?;
                let hash = self.send_transaction(params).await?;
                Ok(utils::serialize(&hash))
            }
            "eth_sign" => {
                let message = string_param(params, 1)?;
                let signature = self.sign_message(&message).await?;
                Ok(Value::String(format!("0x{signature}")))
            }
            "personal_sign" => {
                // personal_sign params are the inverse of eth_sign
                let message = string_param(params, 0)?;
                let signature = self.sign_message(&message).await?;
                Ok(Value::String(format!("0x{signature}")))
            }
            "eth_signTypedData" | "eth_signTypedData_v3" | "eth_signTypedData_v4" => {
                let payload = params.get(1).ok_or_else(|| missing_param(1))?;
                let signature = self.sign_typed_data(payload).await?;
                Ok(Value::String(format!("0x{signature}")))
            }
            "wallet_switchEthereumChain" => {
                #[derive(Debug, Deserialize)]
                struct SwitchChainParams {
                    #[serde(rename = "chainId")]
                    chain_id: String,
                }
                let request: SwitchChainParams = object_param(params, 0)?;
                self.switch_chain(parse_chain_id(&request.chain_id)?).await?;
                Ok(Value::Null)
            }
            passthrough => {
                let provider = self.rpc_provider()?;
                Ok(provider.request(passthrough, params).await?)
            }
        }
    }
}

fn missing_param(position: usize) -> ProviderRpcError {
    ProviderRpcError::new(codes::INVALID_PARAMS, format!("missing parameter {position}"))
}

fn object_param<T: serde::de::DeserializeOwned>(
    params: &[Value],
    position: usize,
) -> Result<T, BridgeError> {
    let value = params.get(position).ok_or_else(|| missing_param(position))?;
    Ok(serde_json::from_value(value.clone())?)
}

fn string_param(params: &[Value], position: usize) -> Result<String, BridgeError> {
    params
        .get(position)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing_param(position).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        device::{ActionStream, AddressOutput, DeviceActionState},
        error::DeviceError,
        scan::{index_path, LEDGER_LEGACY_PATH},
    };
    use futures_util::stream;
    use safekit_core::{
        types::{Address, U256},
        utils::keccak256,
    };
    use safekit_providers::MockProvider;
    use serde_json::json;
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex,
        },
    };

    /// The mock derives a stable address per path.
    fn address_for(path: &str) -> Address {
        Address::from_slice(&keccak256(path.as_bytes())[12..])
    }

    fn test_signature() -> Signature {
        Signature { r: U256::from(1u64), s: U256::from(2u64), v: 27 }
    }

    #[derive(Debug, Default)]
    struct MockDeviceState {
        sign_results: Mutex<VecDeque<DeviceActionState<Signature>>>,
        last_path: Mutex<Option<String>>,
        last_message: Mutex<Option<Vec<u8>>>,
        last_transaction: Mutex<Option<Vec<u8>>>,
        last_typed_data: Mutex<Option<TypedData>>,
        disconnected: AtomicBool,
    }

    #[derive(Clone, Debug, Default)]
    struct MockDevice {
        state: Arc<MockDeviceState>,
    }

    impl MockDevice {
        fn script_sign_result(&self, state: DeviceActionState<Signature>) {
            self.state.sign_results.lock().unwrap().push_back(state);
        }

        fn next_sign_stream(&self, path: &str) -> ActionStream<Signature> {
            *self.state.last_path.lock().unwrap() = Some(path.to_string());
            let state = self
                .state
                .sign_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| DeviceActionState::Completed(test_signature()));
            Box::pin(stream::iter([
                DeviceActionState::Pending {
                    user_interaction: Some("confirm-on-device".to_string()),
                },
                state,
            ]))
        }
    }

    #[async_trait::async_trait]
    impl DeviceActions for MockDevice {
        fn get_address(&self, derivation_path: &str) -> ActionStream<AddressOutput> {
            *self.state.last_path.lock().unwrap() = Some(derivation_path.to_string());
            Box::pin(stream::iter([
                DeviceActionState::Pending { user_interaction: None },
                DeviceActionState::Completed(AddressOutput {
                    address: address_for(derivation_path),
                    public_key: None,
                }),
            ]))
        }

        fn sign_message(&self, derivation_path: &str, message: &[u8]) -> ActionStream<Signature> {
            *self.state.last_message.lock().unwrap() = Some(message.to_vec());
            self.next_sign_stream(derivation_path)
        }

        fn sign_transaction(
            &self,
            derivation_path: &str,
            transaction: &[u8],
        ) -> ActionStream<Signature> {
            *self.state.last_transaction.lock().unwrap() = Some(transaction.to_vec());
            self.next_sign_stream(derivation_path)
        }

        fn sign_typed_data(
            &self,
            derivation_path: &str,
            typed_data: &TypedData,
        ) -> ActionStream<Signature> {
            *self.state.last_typed_data.lock().unwrap() = Some(typed_data.clone());
            self.next_sign_stream(derivation_path)
        }

        async fn disconnect(&self) -> Result<(), DeviceError> {
            self.state.disconnected.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct MockFactory(MockProvider);

    impl ProviderFactory for MockFactory {
        type Client = MockProvider;

        fn provider_for(&self, _chain: &ChainConfig) -> Result<Provider<MockProvider>, BridgeError> {
            Ok(Provider::new(self.0.clone()))
        }
    }

    fn chains() -> Vec<ChainConfig> {
        vec![
            ChainConfig { id: 1, label: "Ethereum".to_string(), rpc_url: "mock://1".to_string() },
            ChainConfig { id: 137, label: "Polygon".to_string(), rpc_url: "mock://137".to_string() },
        ]
    }

    fn bridge() -> (SignerBridge<MockDevice, MockFactory>, MockDevice, MockProvider) {
        let device = MockDevice::default();
        let rpc = MockProvider::new();
        let bridge =
            SignerBridge::new(device.clone(), chains(), MockFactory(rpc.clone())).unwrap();
        (bridge, device, rpc)
    }

    /// Queues balance responses so the first derivation observes `balances[0]`.
    fn push_balances(rpc: &MockProvider, balances: &[u64]) {
        for balance in balances.iter().rev() {
            rpc.push(U256::from(*balance)).unwrap();
        }
    }

    async fn select_account(
        bridge: &SignerBridge<MockDevice, MockFactory>,
        rpc: &MockProvider,
    ) -> DerivationAccount {
        push_balances(rpc, &[0, 0, 0, 0, 0]);
        let accounts = bridge.get_accounts().await.unwrap();
        // drain the scan's balance requests so later assertions start clean
        for index in 0..accounts.len() {
            let address = address_for(&index_path(LEDGER_LIVE_PATH, index));
            rpc.assert_request(
                "eth_getBalance",
                json!([utils::serialize(&address), "latest"]),
            )
            .unwrap();
        }
        accounts[0].clone()
    }

    #[tokio::test]
    async fn scan_stops_after_five_consecutive_zero_balances() {
        let (bridge, _device, rpc) = bridge();
        // balances by index; a sixth zero in a row must end the scan, so any
        // further derivation would hit the mock's empty-responses error
        push_balances(&rpc, &[5, 0, 0, 0, 0, 0]);

        let accounts =
            bridge.derive_accounts(1, Some(LEDGER_LIVE_PATH), None).await.unwrap();

        assert_eq!(accounts.len(), 6);
        assert_eq!(accounts[0].derivation_path, "44'/60'/0'/0/0");
        assert_eq!(accounts[5].derivation_path, "44'/60'/5'/0/0");
        assert_eq!(accounts[0].balance.value, U256::from(5u64));
        assert_eq!(accounts[0].balance.asset, "ETH");
        assert!(accounts[1..].iter().all(|account| account.balance.value.is_zero()));
    }

    #[tokio::test]
    async fn funded_account_resets_the_zero_counter() {
        let (bridge, _device, rpc) = bridge();
        // four zeros, a funded gap account, then five zeros: the funded index
        // resets the counter, so indices 0 through 9 are all derived
        push_balances(&rpc, &[0, 0, 0, 0, 7, 0, 0, 0, 0, 0]);

        let accounts =
            bridge.derive_accounts(1, Some(LEDGER_LEGACY_PATH), None).await.unwrap();

        assert_eq!(accounts.len(), 10);
        assert_eq!(accounts[4].balance.value, U256::from(7u64));
        assert_eq!(accounts[9].derivation_path, "44'/60'/0'/9");
    }

    #[tokio::test]
    async fn custom_derivation_path_returns_exactly_one_account() {
        let (bridge, _device, rpc) = bridge();
        push_balances(&rpc, &[0]);

        let accounts =
            bridge.derive_accounts(1, Some("44'/60'/3'/0/0"), Some("MATIC")).await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].derivation_path, "44'/60'/3'/0/0");
        assert_eq!(accounts[0].address, address_for("44'/60'/3'/0/0"));
        assert_eq!(accounts[0].balance.asset, "MATIC");
    }

    #[tokio::test]
    async fn get_accounts_selects_the_first_account() {
        let (bridge, _device, rpc) = bridge();
        let mut events = bridge.subscribe();

        let selected = select_account(&bridge, &rpc).await;
        assert_eq!(selected.address, address_for("44'/60'/0'/0/0"));
        assert_eq!(bridge.current_account().unwrap(), selected);

        assert_eq!(events.try_next().unwrap().unwrap(), BridgeEvent::ChainChanged(1));
        assert_eq!(
            events.try_next().unwrap().unwrap(),
            BridgeEvent::AccountsChanged(vec![selected.address])
        );
    }

    #[tokio::test]
    async fn eth_accounts_reflects_the_session() {
        let (bridge, _device, rpc) = bridge();
        assert_eq!(bridge.request("eth_accounts", &[]).await.unwrap(), json!([]));

        let selected = select_account(&bridge, &rpc).await;
        assert_eq!(
            bridge.request("eth_accounts", &[]).await.unwrap(),
            json!([selected.address])
        );
    }

    #[tokio::test]
    async fn chain_switching() {
        let (bridge, _device, _rpc) = bridge();
        let mut events = bridge.subscribe();

        assert_eq!(
            bridge.request("eth_chainId", &[]).await.unwrap(),
            json!("0x1")
        );

        let result = bridge
            .request("wallet_switchEthereumChain", &[json!({ "chainId": "0x89" })])
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(events.try_next().unwrap().unwrap(), BridgeEvent::ChainChanged(137));
        assert_eq!(
            bridge.request("eth_chainId", &[]).await.unwrap(),
            json!("0x89")
        );

        let err = bridge
            .request("wallet_switchEthereumChain", &[json!({ "chainId": "0xdead" })])
            .await
            .unwrap_err();
        match err {
            BridgeError::Rpc(err) => {
                assert_eq!(err.code, codes::UNRECOGNIZED_CHAIN_ID);
                assert!(err.message.contains("0xdead"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn sign_transaction_resolves_nonce_from_pending_count() {
        let (bridge, device, rpc) = bridge();
        let selected = select_account(&bridge, &rpc).await;

        rpc.push(U256::from(9u64)).unwrap();
        let params: TransactionParams = serde_json::from_value(json!({
            "to": "0x7a250d5630b4cf539739df2c5dacb4c659f2488d",
            "gasLimit": "0x5208",
            "gasPrice": "0x3b9aca00",
            "value": "0x1",
        }))
        .unwrap();

        let signed = bridge.sign_transaction(params.clone()).await.unwrap();

        // unconfirmed transactions count via the pending tag
        rpc.assert_request(
            "eth_getTransactionCount",
            json!([utils::serialize(&selected.address), "pending"]),
        )
        .unwrap();

        // the device saw the unsigned serialization at the selected path
        let expected = UnsignedTransaction::new(params, 1, U256::from(9u64));
        assert_eq!(
            device.state.last_transaction.lock().unwrap().as_deref(),
            Some(expected.rlp_unsigned().as_ref())
        );
        assert_eq!(
            device.state.last_path.lock().unwrap().as_deref(),
            Some(selected.derivation_path.as_str())
        );
        assert_eq!(signed, expected.rlp_signed(&test_signature()));

        // explicit nonces skip the lookup entirely
        let params: TransactionParams = serde_json::from_value(json!({
            "to": "0x7a250d5630b4cf539739df2c5dacb4c659f2488d",
            "gas": "0x5208",
            "nonce": "0x2",
        }))
        .unwrap();
        bridge.sign_transaction(params).await.unwrap();
        assert!(rpc.assert_request("eth_getTransactionCount", json!([])).is_err());
    }

    #[tokio::test]
    async fn sign_transaction_without_an_account_fails() {
        let (bridge, _device, _rpc) = bridge();
        let err = bridge.sign_transaction(TransactionParams::default()).await.unwrap_err();
        match err {
            BridgeError::Rpc(err) => {
                assert_eq!(err.code, codes::INTERNAL_ERROR);
                assert_eq!(err.message, "No derivation path found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn send_transaction_broadcasts_the_signed_payload() {
        let (bridge, _device, rpc) = bridge();
        select_account(&bridge, &rpc).await;

        let hash = TxHash::from(keccak256(b"tx"));
        rpc.push(hash).unwrap();
        let params: TransactionParams = serde_json::from_value(json!({
            "to": "0x7a250d5630b4cf539739df2c5dacb4c659f2488d",
            "nonce": "0x0",
        }))
        .unwrap();

        let result = bridge.request("eth_sendTransaction", &[json!(params)]).await.unwrap();
        assert_eq!(result, utils::serialize(&hash));

        let expected = UnsignedTransaction::new(params, 1, U256::zero());
        rpc.assert_request(
            "eth_sendRawTransaction",
            json!([expected.rlp_signed(&test_signature())]),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn personal_sign_swaps_the_parameter_order() {
        let (bridge, device, rpc) = bridge();
        let selected = select_account(&bridge, &rpc).await;
        let address = utils::serialize(&selected.address);

        let by_eth_sign = bridge
            .request("eth_sign", &[address.clone(), json!("0xdeadbeef")])
            .await
            .unwrap();
        // the message is signed as provided, not decoded into raw bytes, so
        // the device displays readable hex
        assert_eq!(
            device.state.last_message.lock().unwrap().as_deref(),
            Some(b"0xdeadbeef".as_ref())
        );

        let by_personal_sign = bridge
            .request("personal_sign", &[json!("0xdeadbeef"), address])
            .await
            .unwrap();
        assert_eq!(by_eth_sign, by_personal_sign);
        assert_eq!(
            by_eth_sign,
            json!(format!("0x{}", test_signature()))
        );
    }

    fn typed_data_payload() -> Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "chainId", "type": "uint256" }
                ],
                "Vote": [
                    { "name": "proposal", "type": "uint256" },
                    { "name": "support", "type": "bool" }
                ]
            },
            "primaryType": "Vote",
            "domain": { "name": "Governor", "chainId": 1 },
            "message": { "proposal": "12", "support": true }
        })
    }

    #[tokio::test]
    async fn typed_data_variants_are_aliases() {
        let (bridge, device, rpc) = bridge();
        select_account(&bridge, &rpc).await;

        let address = json!("0x0000000000000000000000000000000000000001");
        let object_payload = typed_data_payload();
        let string_payload = json!(object_payload.to_string());

        let base = bridge
            .request("eth_signTypedData", &[address.clone(), object_payload.clone()])
            .await
            .unwrap();
        let v3 = bridge
            .request("eth_signTypedData_v3", &[address.clone(), object_payload])
            .await
            .unwrap();
        // the stringified payload parses identically
        let v4 = bridge
            .request("eth_signTypedData_v4", &[address, string_payload])
            .await
            .unwrap();

        assert_eq!(base, v3);
        assert_eq!(base, v4);
        let parsed = device.state.last_typed_data.lock().unwrap().clone().unwrap();
        assert_eq!(parsed.primary_type, "Vote");
    }

    #[tokio::test]
    async fn user_rejection_is_classified() {
        let (bridge, device, rpc) = bridge();
        select_account(&bridge, &rpc).await;

        device.script_sign_result(DeviceActionState::Error(DeviceError::status(
            "6985",
            "denied by user",
        )));
        let err = bridge.sign_message("hello").await.unwrap_err();
        assert!(err.is_user_rejection());

        device.script_sign_result(DeviceActionState::Error(DeviceError::status(
            "6a80",
            "invalid data",
        )));
        let err = bridge.sign_message("hello").await.unwrap_err();
        match err {
            BridgeError::Device(info) => {
                assert_eq!(info.message.as_deref(), Some("invalid data"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn disconnect_clears_the_session() {
        let (bridge, device, rpc) = bridge();
        select_account(&bridge, &rpc).await;
        bridge.switch_chain(137).await.unwrap();

        let mut events = bridge.subscribe();
        bridge.disconnect().await.unwrap();

        assert!(device.state.disconnected.load(Ordering::SeqCst));
        assert_eq!(
            events.try_next().unwrap().unwrap(),
            BridgeEvent::AccountsChanged(Vec::new())
        );
        assert_eq!(events.try_next().unwrap().unwrap(), BridgeEvent::ChainChanged(1));
        assert!(bridge.current_account().is_none());
        assert_eq!(bridge.request("eth_accounts", &[]).await.unwrap(), json!([]));
        assert_eq!(bridge.request("eth_chainId", &[]).await.unwrap(), json!("0x1"));
    }

    #[tokio::test]
    async fn unhandled_methods_pass_through_to_the_chain_rpc() {
        let (bridge, _device, rpc) = bridge();
        rpc.push(U256::from(0x10u64)).unwrap();

        let result = bridge.request("eth_blockNumber", &[]).await.unwrap();
        assert_eq!(result, json!("0x10"));
        rpc.assert_request("eth_blockNumber", json!([])).unwrap();
    }
}
