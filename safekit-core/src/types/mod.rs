//! Ethereum data types shared across the workspace.

/// An ABI function selector: the first 4 bytes of the keccak-256 hash of the
/// function signature.
pub type Selector = [u8; 4];

// Re-export common ethereum datatypes with more specific names

/// A transaction hash
pub use ethereum_types::H256 as TxHash;

pub use ethereum_types::{Address, H160, H256, U128, U256, U64};

mod bytes;
pub use bytes::{Bytes, ParseBytesError};

mod block;
pub use block::BlockNumber;

mod signature;
pub use signature::{normalize_v, to_eip155_v, Signature, SignatureError};

mod transaction;
pub use transaction::{TransactionParams, UnsignedTransaction};

mod account;
pub use account::{
    AccountCreationConfig, AccountOverview, AccountRef, AccountSetup, ProxyCreationParams,
    SetupConfig, SharedSetup, UndeployedAccounts,
};

pub mod serde_helpers;
