//! Hashing and deterministic-address utilities.

mod hash;
pub use hash::{id, keccak256, serialize};

mod create2;
pub use create2::{
    get_create2_address, get_create2_address_from_hash, proxy_init_code, proxy_salt,
};
