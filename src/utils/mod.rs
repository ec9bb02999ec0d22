//! Utility functions and helpers
//!
//! Hashing, ECDSA primitives, timestamps and the storage encoding.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, sha256_digest, sha256_hex,
};

pub use serialization::{deserialize, serialize};
