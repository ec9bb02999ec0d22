//! # MewChain - My Minimal Ledger Node
//!
//! This is the small account-based cryptocurrency node I built in Rust.
//! When I come back to this code, here's what I need to remember:
//!
//! ## What I Built
//! - **Account Ledger**: balances are replayed from the chain, no UTXO index
//! - **Proof of Work**: fixed difficulty, hex-prefix target, halving rewards
//! - **Signed Transfers**: ECDSA P-256 over `from‖to‖amount‖timestamp`
//! - **Contracts**: hooks keyed by address that run while a block is assembled
//! - **P2P Sync**: JSON messages over TCP with the longest-chain rule
//! - **Light Client**: one-shot balance queries and transaction broadcasts
//!
//! ## How I Organized My Code
//! - `core/`: blocks, transactions, mining, the monetary schedule and the ledger
//! - `wallet/`: key pairs, addresses and wallet key files
//! - `network/`: wire messages, peers, discovery, the node server and light client
//! - `storage/`: the sled chain store and the pending pool
//! - `config/`: node settings from defaults, TOML and the environment
//! - `utils/`: hashing, signatures, timestamps and bincode helpers
//! - `cli/`: command-line interface
//!
//! ## Key Design Decisions I Made
//! - The ledger sits behind one mutex; proof-of-work runs outside it
//! - Peer chains are verified before they replace mine (`strict_sync`)
//! - The whole chain is stored under a single sled key
//!
//! ## When I Need to Understand Something
//! 1. Start with `main.rs` to see the CLI commands
//! 2. Look at `core/blockchain.rs` for the ledger rules
//! 3. Check `core/transaction.rs` for signing and verification
//! 4. Review `network/server.rs` for how peers are handled

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::{Config, NodeSettings, GLOBAL_CONFIG};
pub use core::{
    Block, Blockchain, ChainParams, Contract, KeyValueContract, ProofOfWork, SyncPolicy,
    Transaction,
};
pub use error::{BlockchainError, Result};
pub use network::{Client, Message, PeerDiscovery, Peers, Server};
pub use storage::{ChainStore, MemoryPool};
pub use utils::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, sha256_digest, sha256_hex,
};
pub use wallet::{address_of, check_address, validate_address, Wallet, Wallets};
