//! Owner/threshold reconciliation for accounts deployed (or about to be
//! deployed) on several chains.

use crate::types::{
    AccountOverview, AccountRef, AccountSetup, Address, SharedSetup, UndeployedAccounts,
};

/// Owner sets are equal when they have the same cardinality and membership;
/// ordering is irrelevant.
fn owners_match(owners: &[Address], other: &[Address]) -> bool {
    owners.len() == other.len() && owners.iter().all(|owner| other.contains(owner))
}

/// Resolves the setup of each account, one result per input in input order.
///
/// A counterfactual record for the account's chain takes precedence over the
/// deployed-state overviews; an account with neither stays `None`. Pure
/// lookup, no network access.
pub fn account_setups(
    accounts: &[AccountRef],
    overviews: &[AccountOverview],
    undeployed: &UndeployedAccounts,
) -> Vec<Option<AccountSetup>> {
    accounts
        .iter()
        .map(|account| {
            if let Some(config) = undeployed.get(account.chain_id, &account.address) {
                return config.setup_view(account.chain_id)
            }
            overviews
                .iter()
                .find(|overview| {
                    overview.chain_id == account.chain_id && overview.address == account.address
                })
                .map(|overview| AccountSetup {
                    owners: overview.owners.clone(),
                    threshold: overview.threshold,
                    chain_id: overview.chain_id,
                })
        })
        .collect()
}

/// Returns the owner/threshold configuration shared by all given setups, or
/// `None` as soon as any entry is absent or deviates from the baseline.
pub fn shared_setup(setups: &[Option<AccountSetup>]) -> Option<SharedSetup> {
    let baseline = setups.iter().flatten().next()?;

    let all_matching = setups.iter().all(|setup| {
        setup.as_ref().map_or(false, |setup| {
            owners_match(&setup.owners, &baseline.owners) && setup.threshold == baseline.threshold
        })
    });

    all_matching.then(|| SharedSetup {
        owners: baseline.owners.clone(),
        threshold: baseline.threshold,
    })
}

/// Returns every setup that differs from the current chain's setup, in input
/// order. Without a setup on the current chain there is nothing to compare
/// against and the result is empty.
pub fn deviating_setups(
    setups: &[Option<AccountSetup>],
    current_chain_id: Option<u64>,
) -> Vec<AccountSetup> {
    let current_chain_id = match current_chain_id {
        Some(id) => id,
        None => return Vec::new(),
    };
    let anchor = match setups.iter().flatten().find(|setup| setup.chain_id == current_chain_id) {
        Some(anchor) => anchor,
        None => return Vec::new(),
    };

    setups
        .iter()
        .flatten()
        .filter(|setup| {
            !owners_match(&setup.owners, &anchor.owners) || setup.threshold != anchor.threshold
        })
        .cloned()
        .collect()
}
