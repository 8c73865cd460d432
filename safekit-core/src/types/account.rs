use crate::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One logical account coordinate: an account address on a specific chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    /// Account address
    pub address: Address,
    /// Chain the account lives (or will live) on
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

/// Owner/threshold configuration of an account on one chain.
///
/// `owners` is semantically a set: membership and cardinality matter,
/// ordering does not.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSetup {
    /// Account owners
    pub owners: Vec<Address>,
    /// Number of required confirmations
    pub threshold: u32,
    /// Chain this setup was observed on
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

/// The configuration shared by every chain of a multi-chain account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSetup {
    /// Account owners
    pub owners: Vec<Address>,
    /// Number of required confirmations
    pub threshold: u32,
}

/// Deployed-state record of an account, as reported by an external indexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountOverview {
    /// Account address
    pub address: Address,
    /// Chain the record was observed on
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    /// Account owners
    pub owners: Vec<Address>,
    /// Number of required confirmations
    pub threshold: u32,
}

/// Parameters of the proxy `setup` initializer call, in the order the factory
/// contract declares them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    /// Initial owners
    pub owners: Vec<Address>,
    /// Number of required confirmations
    pub threshold: U256,
    /// Optional delegate call target executed during setup
    pub to: Address,
    /// Payload for the optional delegate call
    pub data: Bytes,
    /// Fallback handler installed on the account
    pub fallback_handler: Address,
    /// Token the deployment payment is denominated in (zero for native)
    pub payment_token: Address,
    /// Deployment payment amount
    pub payment: U256,
    /// Recipient of the deployment payment
    pub payment_receiver: Address,
}

/// Everything needed to replay an account deployment on another chain with
/// identical parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreationConfig {
    /// The initializer parameters used at original deployment time
    pub setup: SetupConfig,
    /// Proxy factory the account was (or will be) deployed through
    pub factory_address: Address,
    /// Singleton implementation behind the proxy
    pub singleton: Address,
    /// Salt nonce used at original deployment time
    pub salt_nonce: U256,
}

impl AccountCreationConfig {
    /// Projects the owner/threshold view of this configuration for `chain_id`.
    /// `None` when the threshold does not fit the setup representation.
    pub fn setup_view(&self, chain_id: u64) -> Option<AccountSetup> {
        if self.setup.threshold > U256::from(u32::MAX) {
            return None
        }
        Some(AccountSetup {
            owners: self.setup.owners.clone(),
            threshold: self.setup.threshold.low_u32(),
            chain_id,
        })
    }
}

/// Counterfactual (not yet deployed) account records, keyed by chain id and
/// address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndeployedAccounts(pub BTreeMap<u64, BTreeMap<Address, AccountCreationConfig>>);

impl UndeployedAccounts {
    /// Looks up the counterfactual record for an account on a chain.
    pub fn get(&self, chain_id: u64, address: &Address) -> Option<&AccountCreationConfig> {
        self.0.get(&chain_id)?.get(address)
    }

    /// Registers a counterfactual record.
    pub fn insert(&mut self, chain_id: u64, address: Address, config: AccountCreationConfig) {
        self.0.entry(chain_id).or_default().insert(address, config);
    }
}

/// Inputs to a counterfactual address prediction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyCreationParams {
    /// Singleton implementation behind the proxy
    pub singleton: Address,
    /// ABI-encoded initializer call data
    pub initializer: Bytes,
    /// Salt nonce the deployment uses
    pub salt_nonce: U256,
    /// Proxy factory performing the deployment
    pub factory: Address,
}
