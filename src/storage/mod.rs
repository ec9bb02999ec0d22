//! Data storage and persistence
//!
//! The chain store persists the block sequence in sled; the memory pool holds
//! transactions waiting to be mined.

pub mod chain_store;
pub mod memory_pool;

pub use chain_store::ChainStore;
pub use memory_pool::MemoryPool;
