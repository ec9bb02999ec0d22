//! Core ledger functionality
//!
//! Blocks, signed transfers, the proof-of-work search, the monetary schedule,
//! contract hooks and the ledger engine that ties them together.

pub mod block;
pub mod blockchain;
pub mod contract;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH};
pub use blockchain::{Blockchain, SyncPolicy};
pub use contract::{Contract, KeyValueContract};
pub use monetary::{
    ChainParams, GENESIS_ADDRESS, GENESIS_REWARD, INITIAL_BLOCK_REWARD, MAX_SUPPLY,
    MAX_TRANSFER, MIN_TRANSACTION_FEE, TOKEN_NAME, TOKEN_SYMBOL,
};
pub use proof_of_work::ProofOfWork;
pub use transaction::Transaction;
