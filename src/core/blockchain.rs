// The ledger engine: owns the chain, the pending pool, supply accounting and the
// registered contracts. Balances are never indexed; they are replayed from the
// chain on every query. Every append is persisted before it is reported done.

use crate::core::block::GENESIS_PREVIOUS_HASH;
use crate::core::monetary::{
    ChainParams, GENESIS_ADDRESS, GENESIS_MEMO, GENESIS_REWARD, MAX_TRANSFER, MIN_TRANSACTION_FEE,
    REWARD_MEMO,
};
use crate::core::{Block, Contract, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::storage::{ChainStore, MemoryPool};
use crate::utils::current_timestamp;
use log::{error, info, warn};
use std::collections::HashMap;
use std::mem;
use std::path::Path;

/// How much a peer's chain or block is checked before it is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Longer snapshots replace the chain and relayed blocks append as-is
    Trusting,
    /// Incoming data must link, re-hash, meet the proof-of-work target and
    /// mint no more than each height's reward plus the block's fees.
    ///
    /// Genesis is only checked for shape. Every node writes its own genesis
    /// on first run, so a peer's genesis is not expected to match ours.
    Verifying,
}

pub struct Blockchain {
    chain: Vec<Block>,
    pending: MemoryPool,
    contracts: HashMap<String, Box<dyn Contract>>,
    params: ChainParams,
    current_supply: u64,
    store: ChainStore,
}

impl Blockchain {
    /// Open (or initialise) the ledger stored under `<data_dir>/db`
    pub fn create(data_dir: impl AsRef<Path>) -> Result<Blockchain> {
        Self::create_with_params(data_dir, ChainParams::default())
    }

    pub fn create_with_params(data_dir: impl AsRef<Path>, params: ChainParams) -> Result<Blockchain> {
        let store = ChainStore::open(data_dir.as_ref().join("db"))?;
        Self::load(store, params)
    }

    /// Load the persisted chain, or write a fresh genesis block on first run.
    /// Storage errors other than "nothing stored yet" abort.
    pub fn load(store: ChainStore, params: ChainParams) -> Result<Blockchain> {
        let chain = match store.load_chain()? {
            Some(chain) if !chain.is_empty() => chain,
            _ => {
                info!("No stored chain found, creating genesis block");
                let chain = vec![Self::genesis_block()?];
                store.save_chain(&chain)?;
                chain
            }
        };

        let current_supply = Self::supply_of(&chain);
        let blockchain = Blockchain {
            chain,
            pending: MemoryPool::new(),
            contracts: HashMap::new(),
            params,
            current_supply,
            store,
        };

        if let Some(latest) = blockchain.latest_block() {
            info!(
                "Blockchain loaded: {} blocks, latest {} (supply {})",
                blockchain.len(),
                latest.get_hash(),
                current_supply
            );
        }
        Ok(blockchain)
    }

    pub fn genesis_block() -> Result<Block> {
        let distribution = Transaction::new_coinbase(
            GENESIS_ADDRESS,
            GENESIS_REWARD,
            Some(GENESIS_MEMO.to_string()),
        )?;
        Block::genesis(distribution)
    }

    pub fn current_chain(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        self.pending.get_all()
    }

    pub fn current_supply(&self) -> u64 {
        self.current_supply
    }

    pub fn remaining_supply(&self) -> u64 {
        self.params.max_supply.saturating_sub(self.current_supply)
    }

    fn tip_hash(&self) -> String {
        self.latest_block()
            .map(|block| block.get_hash().to_string())
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string())
    }

    // Everything minted by coinbase transactions in the given blocks
    fn supply_of(blocks: &[Block]) -> u64 {
        blocks
            .iter()
            .map(Self::minted_in)
            .fold(0, u64::saturating_add)
    }

    fn minted_in(block: &Block) -> u64 {
        block
            .get_transactions()
            .iter()
            .filter(|tx| tx.is_coinbase())
            .map(Transaction::get_amount)
            .fold(0, u64::saturating_add)
    }

    // Balances are signed; anything past i64::MAX clamps
    fn signed(amount: u64) -> i64 {
        i64::try_from(amount).unwrap_or(i64::MAX)
    }

    /// Why a transaction would be refused by [`Blockchain::submit_transaction`]
    pub fn check_transaction(&self, tx: &Transaction) -> Result<()> {
        if tx.get_amount() > MAX_TRANSFER || tx.get_fee() > MAX_TRANSFER {
            return Err(BlockchainError::InvalidTransaction(format!(
                "amount {} or fee {} is above the limit of {MAX_TRANSFER}",
                tx.get_amount(),
                tx.get_fee()
            )));
        }
        if self.pending.total_fees().checked_add(tx.get_fee()).is_none() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "fee {} would overflow the pooled fee total",
                tx.get_fee()
            )));
        }

        if !tx.is_coinbase() && tx.get_fee() < MIN_TRANSACTION_FEE {
            return Err(BlockchainError::InvalidTransaction(format!(
                "fee {} is below the minimum of {MIN_TRANSACTION_FEE}",
                tx.get_fee()
            )));
        }

        match tx.is_valid() {
            Ok(true) => {}
            Ok(false) => {
                return Err(BlockchainError::InvalidTransaction(
                    "signature verification failed".to_string(),
                ))
            }
            Err(e) => return Err(BlockchainError::InvalidTransaction(e.to_string())),
        }

        if let Some(from) = tx.get_from() {
            let available = self.balance_of(from);
            let covered = u64::try_from(available).is_ok_and(|funds| funds >= tx.get_amount());
            if !covered {
                return Err(BlockchainError::InsufficientFunds {
                    required: tx.get_amount(),
                    available,
                });
            }
        }
        Ok(())
    }

    /// Pool the transaction if it passes [`Blockchain::check_transaction`].
    ///
    /// Rejections are logged, not returned. The balance is checked against the
    /// chain only, so transactions already pooled by the same sender are not
    /// taken into account.
    pub fn submit_transaction(&mut self, tx: Transaction) -> bool {
        match self.check_transaction(&tx) {
            Ok(()) => {
                info!(
                    "Pooled transaction {} -> {} ({} units, fee {})",
                    tx.get_from().unwrap_or("coinbase"),
                    tx.get_to(),
                    tx.get_amount(),
                    tx.get_fee()
                );
                self.pending.add(tx);
                true
            }
            Err(e) => {
                warn!("Rejected transaction: {e}");
                false
            }
        }
    }

    /// Replay the whole chain: credits to `address` minus debits from it
    pub fn balance_of(&self, address: &str) -> i64 {
        let mut balance: i64 = 0;
        for tx in self.chain.iter().flat_map(|block| block.get_transactions()) {
            if tx.get_to() == address {
                balance = balance.saturating_add(Self::signed(tx.get_amount()));
            }
            if tx.get_from() == Some(address) {
                balance = balance.saturating_sub(Self::signed(tx.get_amount()));
            }
        }
        balance
    }

    pub fn reward_for_height(&self, height: u64) -> u64 {
        self.params.reward_for_height(height)
    }

    pub fn register_contract(&mut self, address: &str, contract: Box<dyn Contract>) {
        info!("Registered contract at {address}");
        self.contracts.insert(address.to_string(), contract);
    }

    pub fn contract(&self, address: &str) -> Option<&dyn Contract> {
        self.contracts.get(address).map(|contract| contract.as_ref())
    }

    /// Assemble, mine and append a block of everything pending plus the reward.
    /// Blocks the calling thread for the whole proof-of-work search.
    pub fn mine_pending_transactions(&mut self, miner_address: &str) -> Result<Block> {
        let mut block = self.assemble_block(miner_address)?;
        block.mine(self.params.difficulty)?;
        self.append_block(block.clone())?;
        Ok(block)
    }

    /// Add the reward transaction, run contract hooks and drain the pool into
    /// an unmined block on top of the current tip.
    ///
    /// The reward is the height's halving-adjusted amount, or only the pooled
    /// fees once that amount would push the supply past the cap.
    pub fn assemble_block(&mut self, miner_address: &str) -> Result<Block> {
        let height = self.chain.len() as u64;
        let total_fee = self.pending.total_fees();
        let block_reward = self.reward_for_height(height);

        let payout = if self.current_supply.saturating_add(block_reward) > self.params.max_supply
        {
            info!("Supply cap reached, miner receives fees only ({total_fee})");
            total_fee
        } else {
            block_reward
        };
        self.pending.add(Transaction::new_coinbase(
            miner_address,
            payout,
            Some(REWARD_MEMO.to_string()),
        )?);

        let mut contracts = mem::take(&mut self.contracts);
        for tx in self.pending.get_all() {
            if let Some(contract) = contracts.get_mut(tx.get_to()) {
                if let Err(e) = contract.execute(tx, self) {
                    error!("Contract {} failed: {e}", tx.get_to());
                }
            }
        }
        self.contracts = contracts;

        let transactions = self.pending.take_all();
        info!(
            "Assembled block {height} with {} transactions (reward {payout})",
            transactions.len()
        );
        Block::new(height, self.tip_hash(), current_timestamp()?, transactions)
    }

    /// Append a block mined from [`Blockchain::assemble_block`].
    ///
    /// If the tip moved while it was being mined the block is dropped, its
    /// reward discarded and the user transactions go back to the pool.
    pub fn append_mined_block(&mut self, block: Block) -> Result<bool> {
        if block.get_index() != self.chain.len() as u64
            || block.get_previous_hash() != self.tip_hash()
        {
            warn!(
                "Chain moved while mining block {}, returning its transactions to the pool",
                block.get_index()
            );
            let mut transactions = block.into_transactions();
            transactions.pop();
            self.pending.requeue(transactions);
            return Ok(false);
        }

        self.append_block(block)?;
        Ok(true)
    }

    /// Push a block and persist the chain. No validation happens here.
    pub fn append_block(&mut self, block: Block) -> Result<()> {
        self.current_supply = self.current_supply.saturating_add(Self::minted_in(&block));
        info!("Appending block {} ({})", block.get_index(), block.get_hash());
        self.chain.push(block);
        self.store.save_chain(&self.chain)
    }

    /// Take a block relayed by a peer
    pub fn accept_block(&mut self, block: Block, policy: SyncPolicy) -> Result<bool> {
        if policy == SyncPolicy::Verifying {
            if let Err(e) = self.check_relayed_block(&block) {
                warn!("Ignoring relayed block: {e}");
                return Ok(false);
            }
        }

        self.append_block(block)?;
        Ok(true)
    }

    fn check_relayed_block(&self, block: &Block) -> Result<()> {
        if block.get_index() != self.chain.len() as u64
            || block.get_previous_hash() != self.tip_hash()
        {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} ({}) does not extend the local tip",
                block.get_index(),
                block.get_hash()
            )));
        }
        self.check_block_content(block)
    }

    // Proof-of-work, signatures and minting of one block at its own height
    fn check_block_content(&self, block: &Block) -> Result<()> {
        if !ProofOfWork::new(self.params.difficulty).validate(block) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} misses the proof-of-work target",
                block.get_index()
            )));
        }
        if !Self::transactions_verify(block) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} carries an invalid transaction",
                block.get_index()
            )));
        }

        let (minted, fees) =
            block
                .get_transactions()
                .iter()
                .fold((0u64, 0u64), |(minted, fees), tx| {
                    if tx.is_coinbase() {
                        (minted.saturating_add(tx.get_amount()), fees)
                    } else {
                        (minted, fees.saturating_add(tx.get_fee()))
                    }
                });
        let allowed = self
            .reward_for_height(block.get_index())
            .saturating_add(fees);
        if minted > allowed {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {} mints {minted}, at most {allowed} allowed",
                block.get_index()
            )));
        }
        Ok(())
    }

    fn transactions_verify(block: &Block) -> bool {
        block
            .get_transactions()
            .iter()
            .all(|tx| matches!(tx.is_valid(), Ok(true)))
    }

    /// Linkage and hashes from height 1 onward
    pub fn is_chain_valid(&self) -> bool {
        Self::validate_chain(&self.chain)
    }

    /// Every block from height 1 re-hashes to its stored hash and points at
    /// its predecessor. Height 0 is not re-hashed.
    pub fn validate_chain(chain: &[Block]) -> bool {
        chain.windows(2).all(|pair| {
            let (previous, current) = (&pair[0], &pair[1]);
            let rehashes = matches!(current.compute_hash(), Ok(hash) if hash == current.get_hash());
            rehashes && current.get_previous_hash() == previous.get_hash()
        })
    }

    // Full check of a foreign chain: genesis shape, contiguous indices,
    // linkage, then each block's content.
    fn verify_foreign_chain(&self, chain: &[Block]) -> Result<()> {
        let genesis_ok = match chain.first() {
            Some(genesis) => {
                genesis.get_index() == 0
                    && genesis.get_previous_hash() == GENESIS_PREVIOUS_HASH
                    && matches!(genesis.compute_hash(), Ok(hash) if hash == genesis.get_hash())
            }
            None => false,
        };
        if !genesis_ok {
            return Err(BlockchainError::InvalidBlock(
                "genesis block is malformed".to_string(),
            ));
        }
        if !Self::validate_chain(chain) {
            return Err(BlockchainError::InvalidBlock(
                "blocks do not link or re-hash".to_string(),
            ));
        }

        for (height, block) in chain.iter().enumerate().skip(1) {
            if block.get_index() != height as u64 {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block at height {height} claims index {}",
                    block.get_index()
                )));
            }
            self.check_block_content(block)?;
        }
        Ok(())
    }

    /// Longest-chain rule: adopt `incoming` only when it is strictly longer and
    /// the local chain is itself valid. The losing chain is discarded whole.
    pub fn replace_chain(&mut self, incoming: Vec<Block>, policy: SyncPolicy) -> Result<bool> {
        if incoming.len() <= self.chain.len() {
            return Ok(false);
        }
        if !self.is_chain_valid() {
            warn!("Local chain failed validation, not replacing it");
            return Ok(false);
        }
        if policy == SyncPolicy::Verifying {
            if let Err(e) = self.verify_foreign_chain(&incoming) {
                warn!(
                    "Incoming chain of {} blocks failed verification, keeping local chain: {e}",
                    incoming.len()
                );
                return Ok(false);
            }
        }

        info!(
            "Replacing local blockchain ({} blocks) with incoming blockchain ({} blocks)",
            self.chain.len(),
            incoming.len()
        );
        self.chain = incoming;
        self.current_supply = Self::supply_of(&self.chain);
        self.store.save_chain(&self.chain)?;
        Ok(true)
    }
}
