//! Encoding of the proxy `setup` initializer call.

use crate::{
    types::{Bytes, SetupConfig},
    utils::id,
};
use ethabi::Token;

/// Signature of the account initializer installed by the proxy factory.
const SETUP_SIGNATURE: &str =
    "setup(address[],uint256,address,bytes,address,address,uint256,address)";

/// ABI-encodes the `setup` initializer call for an account configuration.
///
/// A redeployment on another chain must produce bytes identical to the ones
/// used at original deployment time (the counterfactual address depends on
/// them), so the token order follows the factory contract exactly.
pub fn encode_setup_call(config: &SetupConfig) -> Bytes {
    let tokens = [
        Token::Array(config.owners.iter().map(|owner| Token::Address(*owner)).collect()),
        Token::Uint(config.threshold),
        Token::Address(config.to),
        Token::Bytes(config.data.to_vec()),
        Token::Address(config.fallback_handler),
        Token::Address(config.payment_token),
        Token::Uint(config.payment),
        Token::Address(config.payment_receiver),
    ];

    let mut call = id(SETUP_SIGNATURE).to_vec();
    call.extend(ethabi::encode(&tokens));
    call.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, U256};

    fn config() -> SetupConfig {
        SetupConfig {
            owners: vec![
                "f39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap(),
                "70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap(),
            ],
            threshold: U256::from(2u64),
            ..Default::default()
        }
    }

    #[test]
    fn uses_the_factory_selector() {
        let call = encode_setup_call(&config());
        // keccak256("setup(address[],uint256,address,bytes,address,address,uint256,address)")[..4]
        assert_eq!(&call[..4], [0xb6, 0x3e, 0x80, 0x0d]);
    }

    #[test]
    fn encoding_is_deterministic_and_owner_sensitive() {
        let call = encode_setup_call(&config());
        assert_eq!(call, encode_setup_call(&config()));

        let mut reordered = config();
        reordered.owners.reverse();
        assert_ne!(call, encode_setup_call(&reordered));
    }

    #[test]
    fn head_layout() {
        let call = encode_setup_call(&config());
        let body = &call[4..];
        // 8 head words, the dynamic owners array starts right after them
        assert_eq!(
            U256::from_big_endian(&body[..32]),
            U256::from(8 * 32u64),
        );
        // threshold sits in the second head word
        assert_eq!(U256::from_big_endian(&body[32..64]), U256::from(2u64));
    }
}
