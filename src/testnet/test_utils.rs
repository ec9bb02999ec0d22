//! Test utilities for ledger and node tests

use crate::core::{Blockchain, ChainParams, Transaction};
use crate::error::{BlockchainError, Result};
use crate::wallet::Wallet;
use tempfile::TempDir;

/// Default parameters with difficulty 1 so mining finishes instantly
pub fn fast_params() -> ChainParams {
    ChainParams {
        difficulty: 1,
        ..ChainParams::default()
    }
}

/// Create a temporary directory for testing
pub fn create_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(|e| BlockchainError::Io(e.to_string()))
}

/// Create a test blockchain with temporary storage
pub fn create_test_blockchain() -> Result<(Blockchain, TempDir)> {
    create_test_blockchain_with_params(fast_params())
}

pub fn create_test_blockchain_with_params(params: ChainParams) -> Result<(Blockchain, TempDir)> {
    let temp_dir = create_temp_dir()?;
    let blockchain = Blockchain::create_with_params(temp_dir.path(), params)?;
    Ok((blockchain, temp_dir))
}

/// A fresh wallet that has mined one block, so it holds one block reward
pub fn funded_wallet(blockchain: &mut Blockchain) -> Result<Wallet> {
    let wallet = Wallet::generate()?;
    blockchain.mine_pending_transactions(&wallet.get_address())?;
    Ok(wallet)
}

pub fn signed_transfer(from: &Wallet, to: &str, amount: u64, fee: u64) -> Result<Transaction> {
    let mut tx = Transaction::new(&from.get_address(), to, amount, fee, None)?;
    tx.sign(from)?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_blockchain() {
        let (blockchain, _temp_dir) = create_test_blockchain().unwrap();
        assert_eq!(blockchain.len(), 1);
        assert_eq!(blockchain.params().difficulty, 1);
    }

    #[test]
    fn test_funded_wallet_holds_reward() {
        let (mut blockchain, _temp_dir) = create_test_blockchain().unwrap();
        let wallet = funded_wallet(&mut blockchain).unwrap();

        assert_eq!(
            blockchain.balance_of(&wallet.get_address()),
            fast_params().mining_reward as i64
        );
    }

    #[test]
    fn test_signed_transfer_verifies() {
        let wallet = Wallet::generate().unwrap();
        let tx = signed_transfer(&wallet, "0xabc", 1, 1).unwrap();
        assert_eq!(tx.is_valid(), Ok(true));
    }
}
