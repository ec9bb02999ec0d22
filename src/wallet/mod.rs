//! Signing identities and wallet key files
//!
//! A wallet is an ECDSA P-256 key pair. Its address is derived one-way from
//! the public key and is recomputed whenever a signature is checked.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{
    address_of, check_address, validate_address, verify_signature, Wallet, ADDRESS_HASH_LEN,
    ADDRESS_PREFIX,
};
pub use wallets::{Wallets, DEFAULT_WALLET_NAME, WALLET_EXTENSION};
