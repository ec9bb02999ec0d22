use crate::core::{Blockchain, Transaction};
use crate::error::{BlockchainError, Result};
use std::collections::HashMap;

/// Handler invoked for pooled transactions addressed to a registered contract
/// while a block is being assembled.
pub trait Contract: Send {
    fn address(&self) -> &str;

    fn execute(&mut self, tx: &Transaction, ledger: &Blockchain) -> Result<()>;

    /// Last payload stored for `sender`, if any
    fn get_data(&self, sender: &str) -> Option<&str>;
}

/// Per-sender key-value store.
///
/// A zero-amount transaction from a user is a "call": its payload replaces
/// whatever that sender stored before. Non-zero transfers leave it untouched.
#[derive(Debug, Clone, Default)]
pub struct KeyValueContract {
    address: String,
    data: HashMap<String, Option<String>>,
}

impl KeyValueContract {
    pub fn new(address: &str) -> KeyValueContract {
        KeyValueContract {
            address: address.to_string(),
            data: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Contract for KeyValueContract {
    fn address(&self) -> &str {
        self.address.as_str()
    }

    fn execute(&mut self, tx: &Transaction, _ledger: &Blockchain) -> Result<()> {
        if tx.get_to() != self.address {
            return Err(BlockchainError::AddressMismatch {
                expected: self.address.clone(),
                actual: tx.get_to().to_string(),
            });
        }

        if tx.get_amount() == 0 {
            if let Some(sender) = tx.get_from() {
                self.data
                    .insert(sender.to_string(), tx.get_data().map(str::to_string));
            }
        }
        Ok(())
    }

    fn get_data(&self, sender: &str) -> Option<&str> {
        self.data.get(sender).and_then(|payload| payload.as_deref())
    }
}
