use crate::core::{ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, sha256_hex};
use serde::{Deserialize, Serialize};

/// `previousHash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    previous_hash: String,
    timestamp: i64,
    transactions: Vec<Transaction>,
    nonce: u64,
    hash: String,
}

impl Block {
    /// Unmined block at nonce 0 with its hash already computed
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: i64,
        transactions: Vec<Transaction>,
    ) -> Result<Block> {
        let mut block = Block {
            index,
            previous_hash,
            timestamp,
            transactions,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// Genesis holds a single distribution transaction and is never mined
    pub fn genesis(distribution: Transaction) -> Result<Block> {
        Block::new(
            0,
            GENESIS_PREVIOUS_HASH.to_string(),
            current_timestamp()?,
            vec![distribution],
        )
    }

    /// SHA-256 over `index ‖ previousHash ‖ timestamp ‖ JSON(transactions) ‖ nonce`
    pub fn compute_hash(&self) -> Result<String> {
        let transactions = serde_json::to_string(&self.transactions).map_err(|e| {
            BlockchainError::Serialization(format!("Failed to encode transactions: {e}"))
        })?;
        let material = format!(
            "{}{}{}{}{}",
            self.index, self.previous_hash, self.timestamp, transactions, self.nonce
        );
        Ok(sha256_hex(material.as_bytes()))
    }

    pub fn mine(&mut self, difficulty: usize) -> Result<()> {
        ProofOfWork::new(difficulty).run(self)
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    /// Hand the transactions back, used when a mined block loses the race to the tip
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    pub(crate) fn set_hash(&mut self, hash: String) {
        self.hash = hash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward() -> Transaction {
        Transaction::new_coinbase("0xminer", 50, Some("Block reward".to_string())).unwrap()
    }

    #[test]
    fn test_new_block_hash_matches_fields() {
        let block = Block::new(3, "abc".to_string(), 42, vec![reward()]).unwrap();
        assert_eq!(block.get_nonce(), 0);
        assert_eq!(block.get_hash(), block.compute_hash().unwrap());
    }

    #[test]
    fn test_hash_covers_transactions() {
        let a = Block::new(1, "abc".to_string(), 42, vec![reward()]).unwrap();
        let mut b = a.clone();
        b.transactions.clear();
        assert_ne!(a.compute_hash().unwrap(), b.compute_hash().unwrap());
    }

    #[test]
    fn test_hash_material_layout() {
        let block = Block::new(2, "prev".to_string(), 99, vec![]).unwrap();
        assert_eq!(block.get_hash(), sha256_hex(b"2prev99[]0"));
    }

    #[test]
    fn test_genesis_shape() {
        let block = Block::genesis(reward()).unwrap();
        assert_eq!(block.get_index(), 0);
        assert_eq!(block.get_previous_hash(), GENESIS_PREVIOUS_HASH);
        assert_eq!(block.get_transactions().len(), 1);
    }

    #[test]
    fn test_mine_sets_leading_zeros() {
        let mut block = Block::new(1, "abc".to_string(), 42, vec![reward()]).unwrap();
        block.mine(1).unwrap();

        assert!(block.get_hash().starts_with('0'));
        assert_eq!(block.get_hash(), block.compute_hash().unwrap());
    }

    #[test]
    fn test_wire_field_names() {
        let block = Block::new(1, "abc".to_string(), 42, vec![]).unwrap();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["previousHash"], "abc");
        assert_eq!(json["index"], 1);
    }
}
