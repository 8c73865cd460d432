//! The asynchronous device-action protocol the bridge drives.
//!
//! Every device operation (address derivation, signing) is an observable
//! stream of status updates: zero or more [`DeviceActionState::Pending`]
//! states while the device or the user is busy, then exactly one terminal
//! state. [`wait_for_action`] bridges such a stream to a plain future.

use crate::error::{BridgeError, DeviceError};
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use safekit_core::{
    eip712::TypedData,
    types::{Address, Bytes, Signature},
};
use std::pin::Pin;
use tracing::debug;

#[cfg(feature = "ledger")]
#[cfg_attr(docsrs, doc(cfg(feature = "ledger")))]
pub mod ledger;

/// Output of an address-derivation device action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressOutput {
    /// The derived account address
    pub address: Address,
    /// The uncompressed public key, when the transport exposes it
    pub public_key: Option<Bytes>,
}

/// One status update of an in-flight device action.
#[derive(Clone, Debug)]
pub enum DeviceActionState<T> {
    /// The action is waiting on the device or the user, e.g. for the device
    /// to be unlocked or the request to be confirmed on screen.
    Pending {
        /// What the device is waiting for, when known
        user_interaction: Option<String>,
    },
    /// Terminal: the action completed with its output.
    Completed(T),
    /// Terminal: the action failed.
    Error(DeviceError),
}

/// A stream of status updates for one device action.
///
/// Dropping the stream releases the underlying subscription; [`wait_for_action`]
/// drops it on every exit path.
pub type ActionStream<T> = Pin<Box<dyn Stream<Item = DeviceActionState<T>> + Send>>;

/// The device operations the bridge consumes. Each signing method receives
/// the derivation path of the key to use and the payload exactly as it
/// should reach the device.
#[async_trait]
pub trait DeviceActions: Send + Sync {
    /// Derives the address at `derivation_path`.
    fn get_address(&self, derivation_path: &str) -> ActionStream<AddressOutput>;

    /// Signs a personal message. The payload is the message as provided by
    /// the caller; no byte-wrapping is applied on the way to the device.
    fn sign_message(&self, derivation_path: &str, message: &[u8]) -> ActionStream<Signature>;

    /// Signs a serialized unsigned transaction.
    fn sign_transaction(&self, derivation_path: &str, transaction: &[u8])
        -> ActionStream<Signature>;

    /// Signs an EIP-712 typed-data payload.
    fn sign_typed_data(&self, derivation_path: &str, typed_data: &TypedData)
        -> ActionStream<Signature>;

    /// Tears down the device session.
    async fn disconnect(&self) -> Result<(), DeviceError>;
}

/// Drives one device action to its terminal status.
///
/// Resolves with the output on the first [`DeviceActionState::Completed`],
/// fails (classified through [`BridgeError::from_device`]) on the first
/// [`DeviceActionState::Error`], and ignores intermediate states without
/// resolving: the request stays pending until the user acts or the device
/// errors. A stream that ends without a terminal state counts as a transport
/// failure; a transport that neither closes nor emits keeps the future
/// pending, which callers guard with their own timeout.
pub async fn wait_for_action<T>(mut action: ActionStream<T>) -> Result<T, BridgeError> {
    while let Some(state) = action.next().await {
        match state {
            DeviceActionState::Pending { user_interaction } => {
                if let Some(interaction) = user_interaction {
                    debug!(%interaction, "waiting on device");
                }
            }
            DeviceActionState::Completed(output) => return Ok(output),
            DeviceActionState::Error(error) => return Err(BridgeError::from_device(error)),
        }
    }
    Err(BridgeError::Device(DeviceError::message(
        "device action ended without a terminal status",
    )))
}
