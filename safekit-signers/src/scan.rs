//! Derivation-path account scanning.

use crate::{
    device::{wait_for_action, DeviceActions},
    error::BridgeError,
};
use safekit_core::types::{Address, U256};
use safekit_providers::{JsonRpcClient, Provider};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Base derivation path of Ledger Live-generated accounts.
pub const LEDGER_LIVE_PATH: &str = "44'/60'";
/// Base derivation path of legacy (pre-Live) accounts.
pub const LEDGER_LEGACY_PATH: &str = "44'/60'/0'";

/// Scanning stops once this many consecutive zero-balance accounts have been
/// derived.
pub(crate) const MAX_ZERO_BALANCE_ACCOUNTS: usize = 5;

/// Balance of a derived account in the chain's base asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Display label of the asset
    pub asset: String,
    /// Raw balance value
    pub value: U256,
}

/// An account derived from the device during selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationAccount {
    /// The exact path the account was derived at
    #[serde(rename = "derivationPath")]
    pub derivation_path: String,
    /// The derived address
    pub address: Address,
    /// On-chain balance at derivation time
    pub balance: AccountBalance,
}

/// Whether `path` is one of the two recognized scan roots.
pub(crate) fn is_default_base_path(path: &str) -> bool {
    path == LEDGER_LIVE_PATH || path == LEDGER_LEGACY_PATH
}

/// The per-index path under a scan root. Ledger Live hardens the account
/// component, the legacy scheme appends a plain index.
pub(crate) fn index_path(base_path: &str, index: usize) -> String {
    if base_path == LEDGER_LIVE_PATH {
        format!("{base_path}/{index}'/0/0")
    } else {
        format!("{base_path}/{index}")
    }
}

/// Derives the account at `derivation_path` and queries its balance.
pub(crate) async fn derive_account<D, P>(
    device: &D,
    provider: &Provider<P>,
    derivation_path: String,
    asset: &str,
) -> Result<DerivationAccount, BridgeError>
where
    D: DeviceActions + ?Sized,
    P: JsonRpcClient,
{
    let output = wait_for_action(device.get_address(&derivation_path)).await?;
    let balance = provider.get_balance(output.address).await?;

    Ok(DerivationAccount {
        derivation_path,
        address: output.address,
        balance: AccountBalance { asset: asset.to_string(), value: balance },
    })
}

/// Scans sequential indices under `base_path` until 5 consecutive
/// zero-balance accounts have been seen; any funded account resets the
/// counter. Up to 4 trailing zero-balance accounts therefore always follow
/// the last funded one, surfacing "gap" accounts a user funded out of order.
///
/// There is no bound on the total number of indices visited when balances
/// keep alternating; the stopping rule is the counter, nothing else.
pub(crate) async fn scan_accounts<D, P>(
    device: &D,
    provider: &Provider<P>,
    base_path: &str,
    asset: &str,
) -> Result<Vec<DerivationAccount>, BridgeError>
where
    D: DeviceActions + ?Sized,
    P: JsonRpcClient,
{
    let mut accounts = Vec::new();

    let mut zero_balance_accounts = 0;
    let mut index = 0;

    while zero_balance_accounts < MAX_ZERO_BALANCE_ACCOUNTS {
        let account =
            derive_account(device, provider, index_path(base_path, index), asset).await?;

        if account.balance.value.is_zero() {
            zero_balance_accounts += 1;
        } else {
            zero_balance_accounts = 0;
        }

        accounts.push(account);
        index += 1;
    }

    debug!(base_path, count = accounts.len(), "account scan finished");
    Ok(accounts)
}
