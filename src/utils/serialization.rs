// Bincode is the on-disk format; the wire format is JSON (see network::message)
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T>(data: &T) -> Result<Vec<u8>>
where
    T: Serialize + bincode::Encode + ?Sized,
{
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data using bincode 2.0 with standard configuration
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, _) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    #[test]
    fn test_transactions_survive_storage_encoding() {
        let txs = vec![
            Transaction::new_coinbase("0x2dbadd757ab58bf8103877eef34b3a31dac8c1eb", 10, None)
                .unwrap(),
            Transaction::new_coinbase("0x00000000000000000000000000000000000000aa", 3, Some("memo".to_string()))
                .unwrap(),
        ];

        let bytes = serialize(txs.as_slice()).expect("Serialization should work");
        let decoded: Vec<Transaction> = deserialize(&bytes).expect("Deserialization should work");
        assert_eq!(txs, decoded);
    }

    #[test]
    fn test_deserialize_invalid_data() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<Vec<Transaction>> = deserialize(&invalid_bytes);
        assert!(result.is_err());
    }
}
