use crate::core::Transaction;
use std::mem;

/// Pending transactions in admission order.
///
/// Owned by the ledger, so it needs no lock of its own.
#[derive(Debug, Default)]
pub struct MemoryPool {
    pending: Vec<Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            pending: Vec::new(),
        }
    }

    pub fn add(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn get_all(&self) -> &[Transaction] {
        self.pending.as_slice()
    }

    /// Sum of pooled fees, saturating at `u64::MAX`
    pub fn total_fees(&self) -> u64 {
        self.pending
            .iter()
            .map(Transaction::get_fee)
            .fold(0, u64::saturating_add)
    }

    /// Empty the pool, handing back everything in admission order
    pub fn take_all(&mut self) -> Vec<Transaction> {
        mem::take(&mut self.pending)
    }

    /// Put transactions back ahead of anything admitted since they were taken
    pub fn requeue(&mut self, mut txs: Vec<Transaction>) {
        txs.append(&mut self.pending);
        self.pending = txs;
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
