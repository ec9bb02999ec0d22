// A transaction moves `amount` from one account address to another.
// `from == None` marks a coinbase: genesis distribution or a mining reward minted
// by the ledger itself, which carries no signature.

use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, sha256_hex};
use crate::wallet::{address_of, verify_signature, Wallet};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    from: Option<String>,
    to: String,
    amount: u64,
    fee: u64,
    data: Option<String>,
    timestamp: i64,
    signature: Option<String>,
    public_key: Option<String>,
}

impl Transaction {
    /// An unsigned user transaction; call [`Transaction::sign`] before submitting it
    pub fn new(
        from: &str,
        to: &str,
        amount: u64,
        fee: u64,
        data: Option<String>,
    ) -> Result<Transaction> {
        Ok(Transaction {
            from: Some(from.to_string()),
            to: to.to_string(),
            amount,
            fee,
            data,
            timestamp: current_timestamp()?,
            signature: None,
            public_key: None,
        })
    }

    pub fn new_coinbase(to: &str, amount: u64, data: Option<String>) -> Result<Transaction> {
        Ok(Transaction {
            from: None,
            to: to.to_string(),
            amount,
            fee: 0,
            data,
            timestamp: current_timestamp()?,
            signature: None,
            public_key: None,
        })
    }

    /// Digest covered by the signature: `from ‖ to ‖ amount ‖ timestamp`.
    ///
    /// A missing sender renders as `null`. Fee and data are not part of it.
    pub fn compute_hash(&self) -> String {
        let from = self.from.as_deref().unwrap_or("null");
        let material = format!("{}{}{}{}", from, self.to, self.amount, self.timestamp);
        sha256_hex(material.as_bytes())
    }

    pub fn sign(&mut self, wallet: &Wallet) -> Result<()> {
        let signer = wallet.get_address();
        if self.from.as_deref() != Some(signer.as_str()) {
            return Err(BlockchainError::IdentityMismatch {
                expected: self.from.clone().unwrap_or_else(|| "null".to_string()),
                actual: signer,
            });
        }

        let hash = self.compute_hash();
        self.signature = Some(wallet.sign(hash.as_bytes())?);
        self.public_key = Some(wallet.get_public_key_hex());
        Ok(())
    }

    /// Coinbase transactions are always valid. For everything else the
    /// structural problems are errors and a bad signature is `Ok(false)`.
    pub fn is_valid(&self) -> Result<bool> {
        let from = match &self.from {
            Some(from) => from,
            None => return Ok(true),
        };

        let (signature, public_key_hex) = match (&self.signature, &self.public_key) {
            (Some(signature), Some(public_key)) => (signature, public_key),
            _ => return Err(BlockchainError::MissingSignature),
        };

        let public_key = HEXLOWER
            .decode(public_key_hex.as_bytes())
            .map_err(|_| BlockchainError::AddressMismatch {
                expected: from.clone(),
                actual: public_key_hex.clone(),
            })?;

        let derived = address_of(&public_key);
        if &derived != from {
            return Err(BlockchainError::AddressMismatch {
                expected: from.clone(),
                actual: derived,
            });
        }

        Ok(verify_signature(
            &public_key,
            signature,
            self.compute_hash().as_bytes(),
        ))
    }

    pub fn is_coinbase(&self) -> bool {
        self.from.is_none()
    }

    pub fn get_from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn get_to(&self) -> &str {
        self.to.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_fee(&self) -> u64 {
        self.fee
    }

    pub fn get_data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn get_public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }
}
