#![allow(clippy::upper_case_acronyms)]
//! Ledger implementation of the device-action protocol over APDU exchange.
//! [Official Docs](https://github.com/LedgerHQ/app-ethereum/blob/master/doc/ethapp.asc)

use crate::{
    device::{ActionStream, AddressOutput, DeviceActionState, DeviceActions},
    error::DeviceError,
};
use async_trait::async_trait;
use coins_ledger::{
    common::{APDUCommand, APDUData},
    transports::{Ledger, LedgerAsync},
};
use futures_util::{future::BoxFuture, lock::Mutex, stream};
use safekit_core::{
    eip712::TypedData,
    types::{Address, Signature},
};
use std::sync::Arc;
use tracing::debug;

const P1_FIRST: u8 = 0x00;
const P1_MORE: u8 = 0x80;
const P1_NON_CONFIRM: u8 = 0x00;
const P2_NO_CHAINCODE: u8 = 0x00;

const APDU_CODE_SUCCESS: u16 = 0x9000;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(non_camel_case_types)]
enum INS {
    GET_PUBLIC_KEY = 0x02,
    SIGN = 0x04,
    SIGN_PERSONAL_MESSAGE = 0x08,
    SIGN_ETH_EIP_712 = 0x0C,
}

/// A Ledger device running the Ethereum app, driven over the APDU transport.
///
/// Every operation announces one pending state (the user may have to unlock
/// the device or confirm on screen) before the exchange resolves.
#[derive(Debug)]
pub struct LedgerDevice {
    transport: Arc<Mutex<Ledger>>,
}

impl LedgerDevice {
    /// Connects to the first available Ledger device.
    pub async fn init() -> Result<Self, DeviceError> {
        let transport = Ledger::init().await.map_err(transport_error)?;
        Ok(Self { transport: Arc::new(Mutex::new(transport)) })
    }

    async fn exchange(
        transport: &Mutex<Ledger>,
        command: &APDUCommand,
    ) -> Result<Vec<u8>, DeviceError> {
        let transport = transport.lock().await;
        let answer = transport.exchange(command).await.map_err(transport_error)?;
        match answer.retcode() {
            APDU_CODE_SUCCESS => answer
                .data()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| DeviceError::message("expected data in response, found none")),
            code => Err(DeviceError::status(
                format!("{code:x}"),
                format!("device answered with status word 0x{code:x}"),
            )),
        }
    }

    async fn address_for_path(
        transport: &Mutex<Ledger>,
        derivation_path: &str,
    ) -> Result<AddressOutput, DeviceError> {
        let data = APDUData::new(&path_to_bytes(derivation_path)?);
        let command = APDUCommand {
            ins: INS::GET_PUBLIC_KEY as u8,
            p1: P1_NON_CONFIRM,
            p2: P2_NO_CHAINCODE,
            data,
            response_len: None,
        };

        let result = Self::exchange(transport, &command).await?;

        // response layout: len-prefixed public key, then len-prefixed ascii
        // hex address
        let key_len = *result.first().ok_or_else(short_response)? as usize;
        let public_key =
            result.get(1..1 + key_len).ok_or_else(short_response)?.to_vec();
        let offset = 1 + key_len;
        let address_len = *result.get(offset).ok_or_else(short_response)? as usize;
        let address_str =
            result.get(offset + 1..offset + 1 + address_len).ok_or_else(short_response)?;

        let mut address = [0u8; 20];
        let decoded = hex::decode(address_str)
            .map_err(|err| DeviceError::message(format!("malformed address: {err}")))?;
        if decoded.len() != address.len() {
            return Err(short_response())
        }
        address.copy_from_slice(&decoded);

        Ok(AddressOutput {
            address: Address::from(address),
            public_key: Some(public_key.into()),
        })
    }

    /// Signs a payload with the given instruction, chunking it in 255-byte
    /// APDU frames.
    async fn sign_payload(
        transport: &Mutex<Ledger>,
        ins: INS,
        mut payload: Vec<u8>,
    ) -> Result<Signature, DeviceError> {
        let mut command = APDUCommand {
            ins: ins as u8,
            p1: P1_FIRST,
            p2: P2_NO_CHAINCODE,
            data: APDUData::new(&[]),
            response_len: None,
        };

        debug!(ins = ?ins, payload_len = payload.len(), "signing payload");

        let mut result = Vec::new();
        while !payload.is_empty() {
            let chunk_size = std::cmp::min(payload.len(), 255);
            let data = payload.drain(0..chunk_size).collect::<Vec<_>>();
            command.data = APDUData::new(&data);

            result = Self::exchange(transport, &command).await?;

            // the remaining chunks continue the same payload
            command.p1 = P1_MORE;
        }

        if result.len() < 65 {
            return Err(short_response())
        }
        let v = result[0] as u64;
        Signature::from_raw_parts(v, &result[1..65])
            .map_err(|err| DeviceError::message(err.to_string()))
    }
}

#[async_trait]
impl DeviceActions for LedgerDevice {
    fn get_address(&self, derivation_path: &str) -> ActionStream<AddressOutput> {
        let transport = self.transport.clone();
        let derivation_path = derivation_path.to_string();
        action_stream("unlock-device", async move {
            Self::address_for_path(&transport, &derivation_path).await
        })
    }

    fn sign_message(&self, derivation_path: &str, message: &[u8]) -> ActionStream<Signature> {
        let transport = self.transport.clone();
        let derivation_path = derivation_path.to_string();
        let message = message.to_vec();
        action_stream("confirm-on-device", async move {
            let mut payload = path_to_bytes(&derivation_path)?;
            payload.extend_from_slice(&(message.len() as u32).to_be_bytes());
            payload.extend_from_slice(&message);
            Self::sign_payload(&transport, INS::SIGN_PERSONAL_MESSAGE, payload).await
        })
    }

    fn sign_transaction(
        &self,
        derivation_path: &str,
        transaction: &[u8],
    ) -> ActionStream<Signature> {
        let transport = self.transport.clone();
        let derivation_path = derivation_path.to_string();
        let transaction = transaction.to_vec();
        action_stream("confirm-on-device", async move {
            let mut payload = path_to_bytes(&derivation_path)?;
            payload.extend_from_slice(&transaction);
            Self::sign_payload(&transport, INS::SIGN, payload).await
        })
    }

    fn sign_typed_data(
        &self,
        derivation_path: &str,
        typed_data: &TypedData,
    ) -> ActionStream<Signature> {
        let transport = self.transport.clone();
        let derivation_path = derivation_path.to_string();
        let typed_data = typed_data.clone();
        action_stream("confirm-on-device", async move {
            // the eip712 instruction takes the two 32-byte hashes, the device
            // re-displays them for confirmation
            let domain_separator = typed_data.domain.separator();
            let struct_hash = typed_data
                .struct_hash()
                .map_err(|err| DeviceError::message(err.to_string()))?;

            let mut payload = path_to_bytes(&derivation_path)?;
            payload.extend_from_slice(&domain_separator);
            payload.extend_from_slice(&struct_hash);
            Self::sign_payload(&transport, INS::SIGN_ETH_EIP_712, payload).await
        })
    }

    async fn disconnect(&self) -> Result<(), DeviceError> {
        // the HID handle closes when the last transport reference drops;
        // there is no explicit teardown APDU
        Ok(())
    }
}

/// Announces `user_interaction`, then runs the action to its terminal state.
fn action_stream<T, F>(user_interaction: &str, action: F) -> ActionStream<T>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T, DeviceError>> + Send + 'static,
{
    enum Stage<T> {
        Announce(Option<String>, BoxFuture<'static, Result<T, DeviceError>>),
        Run(BoxFuture<'static, Result<T, DeviceError>>),
        Done,
    }

    let stage = Stage::Announce(Some(user_interaction.to_string()), Box::pin(action));
    Box::pin(stream::unfold(stage, |stage| async move {
        match stage {
            Stage::Announce(user_interaction, action) => {
                Some((DeviceActionState::Pending { user_interaction }, Stage::Run(action)))
            }
            Stage::Run(action) => {
                let state = match action.await {
                    Ok(output) => DeviceActionState::Completed(output),
                    Err(error) => DeviceActionState::Error(error),
                };
                Some((state, Stage::Done))
            }
            Stage::Done => None,
        }
    }))
}

fn transport_error(err: coins_ledger::errors::LedgerError) -> DeviceError {
    DeviceError::message(err.to_string())
}

fn short_response() -> DeviceError {
    DeviceError::message("cannot deserialize ledger response, insufficient bytes")
}

// converts a derivation path to its APDU byte representation
fn path_to_bytes(derivation_path: &str) -> Result<Vec<u8>, DeviceError> {
    let elements = derivation_path
        .split('/')
        .filter(|element| *element != "m" && !element.is_empty())
        .collect::<Vec<_>>();
    if elements.is_empty() || elements.len() > 10 {
        return Err(DeviceError::message(format!(
            "invalid derivation path: {derivation_path}"
        )))
    }

    let mut bytes = vec![elements.len() as u8];
    for derivation_index in elements {
        let hardened = derivation_index.contains('\'');
        let index = derivation_index
            .replace('\'', "")
            .parse::<u32>()
            .map_err(|_| {
                DeviceError::message(format!("invalid derivation path: {derivation_path}"))
            })?;
        let index = if hardened { index | 0x8000_0000 } else { index };

        bytes.extend(&index.to_be_bytes());
    }

    Ok(bytes)
}
