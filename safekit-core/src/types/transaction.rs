use crate::types::{normalize_v, to_eip155_v, Address, Bytes, Signature, U256};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};

/// Legacy transactions have 9 RLP fields, typed EIP-1559 payloads have 9
/// unsigned fields as well (the access list replaces the EIP-155 tail).
const NUM_TX_FIELDS: usize = 9;

/// Transaction fields as they arrive on the `eth_signTransaction` boundary.
///
/// The gas limit is accepted under either of the two field names in
/// circulation (`gas` and `gasLimit`); fee fields that are absent keep their
/// `null` semantics all the way into the serialized transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionParams {
    /// Sender address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,

    /// Recipient address (None for contract creation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,

    /// Supplied gas
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,

    /// Alternative spelling of the gas limit
    #[serde(default, rename = "gasLimit", skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,

    /// Legacy gas price
    #[serde(default, rename = "gasPrice", skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,

    /// EIP-1559 fee cap
    #[serde(default, rename = "maxFeePerGas", skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,

    /// EIP-1559 priority fee
    #[serde(
        default,
        rename = "maxPriorityFeePerGas",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_priority_fee_per_gas: Option<U256>,

    /// Transferred value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,

    /// Call data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,

    /// Transaction nonce (None to resolve the pending transaction count)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
}

impl TransactionParams {
    /// Gas limit under either accepted field name.
    pub fn gas(&self) -> Option<U256> {
        self.gas.or(self.gas_limit)
    }

    /// Whether the request carries EIP-1559 fee fields and must be serialized
    /// as a typed transaction.
    pub fn is_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}

/// A transaction ready for device signing: request fields joined with the
/// session chain id and a resolved nonce.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// EIP-155 chain id the transaction is bound to
    pub chain_id: u64,
    /// Resolved nonce
    pub nonce: U256,
    /// The request fields
    pub params: TransactionParams,
}

impl UnsignedTransaction {
    /// Binds `params` to a chain and nonce.
    pub fn new(params: TransactionParams, chain_id: u64, nonce: U256) -> Self {
        Self { chain_id, nonce, params }
    }

    /// The serialized bytes the device signs.
    ///
    /// Legacy requests produce the EIP-155 preimage (`chain_id, 0, 0` tail),
    /// requests carrying 1559 fee fields produce the `0x02`-typed envelope.
    pub fn rlp_unsigned(&self) -> Bytes {
        if self.params.is_eip1559() {
            let mut rlp = RlpStream::new();
            rlp.begin_list(NUM_TX_FIELDS);
            self.rlp_base_eip1559(&mut rlp);
            enveloped(rlp.out().freeze())
        } else {
            let mut rlp = RlpStream::new();
            rlp.begin_list(NUM_TX_FIELDS);
            self.rlp_base(&mut rlp);
            rlp.append(&self.chain_id);
            rlp.append(&0u8);
            rlp.append(&0u8);
            rlp.out().freeze().into()
        }
    }

    /// Produces the serialized transaction with the provided signature
    /// attached, ready for `eth_sendRawTransaction`.
    pub fn rlp_signed(&self, signature: &Signature) -> Bytes {
        let parity = normalize_v(signature.v);
        if self.params.is_eip1559() {
            let mut rlp = RlpStream::new();
            rlp.begin_list(NUM_TX_FIELDS + 3);
            self.rlp_base_eip1559(&mut rlp);
            rlp.append(&parity);
            rlp.append(&signature.r);
            rlp.append(&signature.s);
            enveloped(rlp.out().freeze())
        } else {
            let mut rlp = RlpStream::new();
            rlp.begin_list(NUM_TX_FIELDS);
            self.rlp_base(&mut rlp);
            rlp.append(&to_eip155_v(parity, self.chain_id));
            rlp.append(&signature.r);
            rlp.append(&signature.s);
            rlp.out().freeze().into()
        }
    }

    fn rlp_base(&self, rlp: &mut RlpStream) {
        rlp.append(&self.nonce);
        rlp_opt(rlp, &self.params.gas_price);
        rlp_opt(rlp, &self.params.gas());
        rlp_opt(rlp, &self.params.to);
        rlp_opt(rlp, &self.params.value);
        rlp_opt(rlp, &self.params.data.as_ref().map(|d| d.as_ref()));
    }

    fn rlp_base_eip1559(&self, rlp: &mut RlpStream) {
        rlp.append(&self.chain_id);
        rlp.append(&self.nonce);
        rlp_opt(rlp, &self.params.max_priority_fee_per_gas);
        rlp_opt(rlp, &self.params.max_fee_per_gas);
        rlp_opt(rlp, &self.params.gas());
        rlp_opt(rlp, &self.params.to);
        rlp_opt(rlp, &self.params.value);
        rlp_opt(rlp, &self.params.data.as_ref().map(|d| d.as_ref()));
        // no access list support on the signing boundary
        rlp.begin_list(0);
    }
}

fn rlp_opt<T: rlp::Encodable>(rlp: &mut RlpStream, opt: &Option<T>) {
    if let Some(inner) = opt {
        rlp.append(inner);
    } else {
        rlp.append(&"");
    }
}

fn enveloped(payload: bytes::Bytes) -> Bytes {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(0x02);
    out.extend_from_slice(payload.as_ref());
    out.into()
}
