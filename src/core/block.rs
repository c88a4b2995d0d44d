use crate::core::Transaction;
use crate::crypto::hash::{Hash256, Hashable};
use crate::mining::pow;
use crate::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: Vec<u8>,
    pub transactions: Vec<Transaction>,
    /// Empty for the genesis block.
    pub prev_hash: Vec<u8>,
    pub nonce: u64,
}

impl Block {
    /// Mines a block on top of `prev_hash`.
    pub fn create(transactions: Vec<Transaction>, prev_hash: Vec<u8>, difficulty: u32) -> Result<Self> {
        let mut block = Self {
            hash: Vec::new(),
            transactions,
            prev_hash,
            nonce: 0,
        };

        let (nonce, hash) = pow::mine(&block.prev_hash, &block.transactions, difficulty)?;
        block.nonce = nonce;
        block.hash = hash.to_vec();

        Ok(block)
    }

    pub fn genesis(coinbase: Transaction, difficulty: u32) -> Result<Self> {
        Self::create(vec![coinbase], Vec::new(), difficulty)
    }

    /// Flat commitment to the transaction set: SHA-256 over the concatenated
    /// transaction ids, in block order.
    pub fn hash_transactions(transactions: &[Transaction]) -> Hash256 {
        let mut ids = Vec::with_capacity(transactions.len() * 32);
        for tx in transactions {
            ids.extend_from_slice(&tx.id);
        }
        ids.hash()
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{TxInput, TxOutput};

    const TEST_DIFFICULTY: u32 = 8;

    #[test]
    fn test_genesis_block() -> Result<()> {
        let coinbase = Transaction::new_coinbase("Alice", "genesis");
        let block = Block::genesis(coinbase.clone(), TEST_DIFFICULTY)?;

        assert!(block.is_genesis());
        assert_eq!(block.transactions, vec![coinbase]);
        assert_eq!(block.hash.len(), 32);
        assert!(pow::validate(&block, TEST_DIFFICULTY)?);
        Ok(())
    }

    #[test]
    fn test_block_links_to_parent() -> Result<()> {
        let genesis = Block::genesis(Transaction::new_coinbase("Alice", ""), TEST_DIFFICULTY)?;
        let child = Block::create(
            vec![Transaction::new_coinbase("Bob", "")],
            genesis.hash.clone(),
            TEST_DIFFICULTY,
        )?;

        assert!(!child.is_genesis());
        assert_eq!(child.prev_hash, genesis.hash);
        assert!(pow::validate(&child, TEST_DIFFICULTY)?);
        Ok(())
    }

    #[test]
    fn test_mutation_invalidates_hash() -> Result<()> {
        let mut block = Block::genesis(Transaction::new_coinbase("Alice", ""), TEST_DIFFICULTY)?;
        block.transactions.push(Transaction::new_coinbase("Mallory", ""));
        assert!(!pow::validate(&block, TEST_DIFFICULTY)?);

        let mut block = Block::genesis(Transaction::new_coinbase("Alice", ""), TEST_DIFFICULTY)?;
        block.prev_hash = vec![1u8; 32];
        assert!(!pow::validate(&block, TEST_DIFFICULTY)?);
        Ok(())
    }

    #[test]
    fn test_serialization_round_trip() -> Result<()> {
        let coinbase = Transaction::new_coinbase("Alice", "");
        let spend = Transaction::from_parts(
            vec![TxInput {
                id: coinbase.id.clone(),
                out: 0,
                sig: "Alice".to_string(),
            }],
            vec![
                TxOutput { value: 40, pub_key: "Bob".to_string() },
                TxOutput { value: 60, pub_key: "Alice".to_string() },
            ],
        );
        let block = Block::create(vec![coinbase, spend], vec![0xee; 32], TEST_DIFFICULTY)?;

        let decoded = Block::deserialize(&block.serialize()?)?;
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash, block.hash);
        assert_eq!(decoded.prev_hash, block.prev_hash);
        assert_eq!(decoded.nonce, block.nonce);
        assert_eq!(decoded.transactions, block.transactions);
        Ok(())
    }

    #[test]
    fn test_hash_transactions_is_order_sensitive() {
        let a = Transaction::new_coinbase("Alice", "");
        let b = Transaction::new_coinbase("Bob", "");

        let forward = Block::hash_transactions(&[a.clone(), b.clone()]);
        let backward = Block::hash_transactions(&[b, a]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn test_deserialize_garbage_fails() {
        assert!(Block::deserialize(&[0xff, 0x01]).is_err());
    }
}
