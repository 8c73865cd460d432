use super::hash::keccak256;
use crate::types::{Address, H256, U256};

/// Returns the CREATE2 address of a contract deployed through `from` with the
/// given salt and init code:
/// `keccak256(0xff ++ from ++ salt ++ keccak256(init_code))[12..]`
pub fn get_create2_address(
    from: Address,
    salt: impl AsRef<[u8]>,
    init_code: impl AsRef<[u8]>,
) -> Address {
    get_create2_address_from_hash(from, salt, keccak256(init_code))
}

/// Returns the CREATE2 address when the init code hash is already known.
pub fn get_create2_address_from_hash(
    from: Address,
    salt: impl AsRef<[u8]>,
    init_code_hash: impl AsRef<[u8]>,
) -> Address {
    let salt = salt.as_ref();
    let init_code_hash = init_code_hash.as_ref();

    let mut bytes = Vec::with_capacity(1 + 20 + salt.len() + init_code_hash.len());
    bytes.push(0xff);
    bytes.extend_from_slice(from.as_bytes());
    bytes.extend_from_slice(salt);
    bytes.extend_from_slice(init_code_hash);

    let hash = keccak256(bytes);
    Address::from_slice(&hash[12..])
}

/// Computes the deployment salt a proxy factory derives from its inputs:
/// `keccak256(keccak256(initializer) ++ salt_nonce)`.
///
/// The two parts are concatenated, not hashed as a tuple, and the nonce is
/// packed big-endian into a full 32-byte word.
pub fn proxy_salt(initializer: impl AsRef<[u8]>, salt_nonce: U256) -> H256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(&keccak256(initializer));
    salt_nonce.to_big_endian(&mut preimage[32..]);
    H256(keccak256(preimage))
}

/// Builds the init code the factory deploys: its proxy creation code followed
/// by the singleton address packed as a 32-byte uint256, the constructor
/// argument encoding the original deployment used.
pub fn proxy_init_code(creation_code: impl AsRef<[u8]>, singleton: Address) -> Vec<u8> {
    let creation_code = creation_code.as_ref();
    let mut init_code = Vec::with_capacity(creation_code.len() + 32);
    init_code.extend_from_slice(creation_code);

    let mut word = [0u8; 32];
    word[12..].copy_from_slice(singleton.as_bytes());
    init_code.extend_from_slice(&word);

    init_code
}
