use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Peer wire message: a JSON object `{"type": ..., "data": ...}`.
/// Messages are written back-to-back on the socket with no framing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    /// Full chain, sent on every new connection and after mining
    #[serde(rename = "blockchain")]
    ChainSnapshot(Vec<Block>),
    Transaction(Transaction),
    Block(Block),
    BalanceQuery { address: String },
    BalanceResponse(i64),
}

impl Message {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| BlockchainError::Serialization(format!("Failed to encode message: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Message> {
        serde_json::from_slice(bytes)
            .map_err(|e| BlockchainError::Serialization(format!("Failed to decode message: {e}")))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::ChainSnapshot(_) => "blockchain",
            Message::Transaction(_) => "transaction",
            Message::Block(_) => "block",
            Message::BalanceQuery { .. } => "balance_query",
            Message::BalanceResponse(_) => "balance_response",
        }
    }
}
