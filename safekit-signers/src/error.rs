use safekit_providers::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// EIP-1193 provider error codes used by the bridge.
pub mod codes {
    /// The requested chain has not been added to the bridge's chain list.
    pub const UNRECOGNIZED_CHAIN_ID: i64 = 4902;
    /// The user rejected the request.
    pub const USER_REJECTED_REQUEST: i64 = 4001;
    /// A method handler crashed; the message carries the reason.
    pub const INTERNAL_ERROR: i64 = -32000;
    /// The request parameters do not match the method.
    pub const INVALID_PARAMS: i64 = -32602;
}

/// Device status code emitted when the user declines an action on the device.
pub(crate) const REJECTED_CODE: &str = "6985";

/// A structured provider error as surfaced to EIP-1193 callers.
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
#[error("(code: {code}, message: {message})")]
pub struct ProviderRpcError {
    /// Error code, see [`codes`]
    pub code: i64,
    /// Human-readable reason
    pub message: String,
    /// Method-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    /// Creates an error with the given code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }
}

/// An error reported by the device transport or an in-flight device action.
#[derive(Clone, Debug, Default, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{}", .message.as_deref().unwrap_or("unknown device error"))]
pub struct DeviceError {
    /// Device status code, when the transport reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Transport-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl DeviceError {
    /// A transport error with just a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self { code: None, message: Some(message.into()), data: None }
    }

    /// A status-code error as the device reports it.
    pub fn status(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code.into()), message: Some(message.into()), data: None }
    }

    /// Whether this error means "declined on device".
    pub fn is_rejection(&self) -> bool {
        self.code.as_deref() == Some(REJECTED_CODE)
    }
}

/// The error taxonomy of the signing bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A structured provider error (unrecognized chain, missing derivation
    /// path, malformed parameters)
    #[error(transparent)]
    Rpc(#[from] ProviderRpcError),

    /// The user declined the action on the device. Callers treat this as an
    /// expected outcome, not a failure.
    #[error("user rejected action")]
    UserRejected {
        /// The device error the rejection was derived from
        info: DeviceError,
    },

    /// Transport or communication failure with the device
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// A chain read or submission failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A payload failed to (de)serialize
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl BridgeError {
    /// Classifies a terminal device error: the decline status code becomes
    /// the standardized user rejection, everything else stays a device error
    /// retaining the original message and payload.
    pub fn from_device(error: DeviceError) -> Self {
        if error.is_rejection() {
            BridgeError::UserRejected { info: error }
        } else {
            BridgeError::Device(error)
        }
    }

    /// Whether this failure is an intentional cancel rather than a fault.
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, BridgeError::UserRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decline_code_maps_to_user_rejection() {
        let err = BridgeError::from_device(DeviceError::status("6985", "denied by user"));
        assert!(err.is_user_rejection());
        match err {
            BridgeError::UserRejected { info } => {
                assert_eq!(info.message.as_deref(), Some("denied by user"))
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn other_codes_stay_device_errors() {
        let original = DeviceError::status("6a80", "invalid data");
        let err = BridgeError::from_device(original.clone());
        assert!(!err.is_user_rejection());
        match err {
            BridgeError::Device(info) => assert_eq!(info, original),
            _ => unreachable!(),
        }
    }
}
