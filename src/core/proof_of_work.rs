use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::info;

/// Leading-zero hex digit search over a block's nonce
pub struct ProofOfWork {
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> ProofOfWork {
        ProofOfWork { difficulty }
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    /// True when the first `difficulty` characters of `hash` are all `'0'`
    pub fn meets_target(&self, hash: &str) -> bool {
        hash.len() >= self.difficulty && hash.bytes().take(self.difficulty).all(|b| b == b'0')
    }

    /// Hash recomputes from the block's own fields and meets the target
    pub fn validate(&self, block: &Block) -> bool {
        match block.compute_hash() {
            Ok(hash) => hash == block.get_hash() && self.meets_target(&hash),
            Err(_) => false,
        }
    }

    /// Bump the nonce until the hash meets the target. Runs to completion.
    pub fn run(&self, block: &mut Block) -> Result<()> {
        info!(
            "Mining block {} at difficulty {}",
            block.get_index(),
            self.difficulty
        );

        let mut nonce = block.get_nonce();
        let mut hash = block.compute_hash()?;
        while !self.meets_target(&hash) {
            nonce = nonce.checked_add(1).ok_or_else(|| {
                BlockchainError::Mining("Nonce space exhausted".to_string())
            })?;
            block.set_nonce(nonce);
            hash = block.compute_hash()?;
        }
        block.set_hash(hash);

        info!("Block mined: {} (nonce {nonce})", block.get_hash());
        Ok(())
    }
}
