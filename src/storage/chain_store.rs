use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use log::debug;
use sled::Db;
use std::path::{Path, PathBuf};

// The whole chain lives under one key
const CHAIN_KEY: &str = "chain";

/// Sled-backed persistence of the block sequence
pub struct ChainStore {
    db: Db,
    db_path: Option<PathBuf>,
}

impl ChainStore {
    pub fn open(path: impl AsRef<Path>) -> Result<ChainStore> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        Ok(ChainStore {
            db,
            db_path: Some(path),
        })
    }

    /// In-memory store that disappears on drop
    pub fn temporary() -> Result<ChainStore> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        Ok(ChainStore { db, db_path: None })
    }

    pub fn get_db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// `Ok(None)` on first run; any other failure is an error
    pub fn load_chain(&self) -> Result<Option<Vec<Block>>> {
        let bytes = self
            .db
            .get(CHAIN_KEY)
            .map_err(|e| BlockchainError::Database(format!("Failed to read chain: {e}")))?;

        match bytes {
            Some(bytes) => {
                let chain: Vec<Block> = deserialize(bytes.as_ref())?;
                debug!("Loaded {} blocks from store", chain.len());
                Ok(Some(chain))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the stored chain and flush before returning
    pub fn save_chain(&self, chain: &[Block]) -> Result<()> {
        let bytes = serialize(chain)?;
        self.db
            .insert(CHAIN_KEY, bytes)
            .map_err(|e| BlockchainError::Database(format!("Failed to write chain: {e}")))?;
        self.db.flush()?;
        Ok(())
    }
}
