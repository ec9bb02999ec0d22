//! Token constants and the reward schedule
//!
//! Amounts are whole units of the smallest denomination. The base mining
//! reward halves every `halving_interval` blocks and never drops below one
//! unit; minting stops paying the reward once `max_supply` would be exceeded.

use serde::{Deserialize, Serialize};

pub const TOKEN_NAME: &str = "MewChain";
pub const TOKEN_SYMBOL: &str = "MCH";

/// Receives the genesis distribution; nobody holds its key
pub const GENESIS_ADDRESS: &str = "0x2dbadd757ab58bf8103877eef34b3a31dac8c1eb";
pub const GENESIS_REWARD: u64 = 10_000;
pub const GENESIS_MEMO: &str = "Genesis distribution";
pub const REWARD_MEMO: &str = "Block reward";

pub const DEFAULT_DIFFICULTY: usize = 4;
pub const INITIAL_BLOCK_REWARD: u64 = 5_000;
pub const MAX_SUPPLY: u64 = 21_000_000;
pub const HALVING_INTERVAL: u64 = 210_000;

/// Smallest fee a user transaction may carry
pub const MIN_TRANSACTION_FEE: u64 = 1;

/// Largest amount or fee a single transaction may carry, so it always fits a
/// signed balance
pub const MAX_TRANSFER: u64 = i64::MAX as u64;

/// Consensus parameters of a ledger instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    pub difficulty: usize,
    pub mining_reward: u64,
    pub max_supply: u64,
    pub halving_interval: u64,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            mining_reward: INITIAL_BLOCK_REWARD,
            max_supply: MAX_SUPPLY,
            halving_interval: HALVING_INTERVAL,
        }
    }
}

impl ChainParams {
    /// `max(1, mining_reward / 2^floor(height / halving_interval))`
    pub fn reward_for_height(&self, height: u64) -> u64 {
        let halvings = height / self.halving_interval.max(1);
        let reward = if halvings >= u64::BITS as u64 {
            0
        } else {
            self.mining_reward >> halvings
        };
        reward.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = ChainParams::default();
        assert_eq!(params.difficulty, 4);
        assert_eq!(params.mining_reward, 5_000);
        assert_eq!(params.max_supply, 21_000_000);
        assert_eq!(params.halving_interval, 210_000);
    }

    #[test]
    fn test_reward_halves_on_interval_boundaries() {
        let params = ChainParams {
            halving_interval: 10,
            ..ChainParams::default()
        };

        assert_eq!(params.reward_for_height(0), 5_000);
        assert_eq!(params.reward_for_height(9), 5_000);
        assert_eq!(params.reward_for_height(10), 2_500);
        assert_eq!(params.reward_for_height(19), 2_500);
        assert_eq!(params.reward_for_height(20), 1_250);
        assert_eq!(params.reward_for_height(40), 312);
    }

    #[test]
    fn test_reward_floors_at_one_unit() {
        let params = ChainParams {
            halving_interval: 1,
            ..ChainParams::default()
        };
        assert_eq!(params.reward_for_height(13), 1);
        assert_eq!(params.reward_for_height(64), 1);
        assert_eq!(params.reward_for_height(u64::MAX), 1);
    }

    #[test]
    fn test_params_from_partial_toml() {
        let params: ChainParams = toml::from_str("difficulty = 2").unwrap();
        assert_eq!(params.difficulty, 2);
        assert_eq!(params.mining_reward, INITIAL_BLOCK_REWARD);
    }
}
