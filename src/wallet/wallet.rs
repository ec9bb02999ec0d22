use crate::error::{BlockchainError, Result};
use crate::utils::{
    ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair, sha256_hex,
};
use data_encoding::HEXLOWER;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const ADDRESS_PREFIX: &str = "0x";
/// Number of hex digits of the public-key hash kept in an address
pub const ADDRESS_HASH_LEN: usize = 40;

/// A signing identity: ECDSA P-256 key pair plus its derived address
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    #[zeroize(skip)]
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn generate() -> Result<Wallet> {
        let pkcs8 = new_key_pair()?;
        Self::from_pkcs8(&pkcs8)
    }

    /// Rebuild an identity from its PKCS#8 private key document
    pub fn from_pkcs8(pkcs8: &[u8]) -> Result<Wallet> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
            .map_err(|e| {
                BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
            })?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(Wallet {
            pkcs8: pkcs8.to_vec(),
            public_key,
        })
    }

    pub fn get_address(&self) -> String {
        address_of(&self.public_key)
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_public_key_hex(&self) -> String {
        HEXLOWER.encode(&self.public_key)
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }

    /// Sign `message`, returning the signature hex-encoded
    pub fn sign(&self, message: &[u8]) -> Result<String> {
        let signature = ecdsa_p256_sha256_sign_digest(&self.pkcs8, message)?;
        Ok(HEXLOWER.encode(&signature))
    }
}

/// Check a hex-encoded signature against a raw public key
pub fn verify_signature(public_key: &[u8], signature_hex: &str, message: &[u8]) -> bool {
    match HEXLOWER.decode(signature_hex.as_bytes()) {
        Ok(signature) => ecdsa_p256_sha256_sign_verify(public_key, &signature, message),
        Err(_) => false,
    }
}

/// `0x` followed by the first 40 hex digits of SHA-256(public key)
pub fn address_of(public_key: &[u8]) -> String {
    let hash = sha256_hex(public_key);
    format!("{ADDRESS_PREFIX}{}", &hash[..ADDRESS_HASH_LEN])
}

pub fn validate_address(address: &str) -> bool {
    match address.strip_prefix(ADDRESS_PREFIX) {
        Some(digits) => {
            digits.len() == ADDRESS_HASH_LEN
                && digits
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        None => false,
    }
}

/// [`validate_address`] as an error, for callers that propagate with `?`
pub fn check_address(address: &str) -> Result<()> {
    if validate_address(address) {
        Ok(())
    } else {
        Err(BlockchainError::InvalidAddress(address.to_string()))
    }
}
