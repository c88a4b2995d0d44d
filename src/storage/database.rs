use crate::core::Block;
use crate::{LedgerError, Result};
use sled::transaction::{ConflictableTransactionError, TransactionResult};
use sled::{Db, Tree};
use std::path::Path;
use std::sync::Arc;

// Block records keyed by their hash, plus the tip marker
const TREE_CHAIN: &str = "chain";

/// Reserved key holding the hash of the newest block.
pub const LAST_HASH_KEY: &[u8] = b"lh";

#[derive(Debug, Clone)]
pub struct Database {
    db: Arc<Db>,
    chain: Tree,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| LedgerError::Storage(format!("Failed to open database: {}", e)))?;
        let chain = db.open_tree(TREE_CHAIN)
            .map_err(|e| LedgerError::Storage(format!("Failed to open tree {}: {}", TREE_CHAIN, e)))?;

        Ok(Self {
            db: Arc::new(db),
            chain,
        })
    }

    /// Whether a database directory has already been created at `path`.
    pub fn exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().join("db").exists() || path.as_ref().join("conf").exists()
    }

    pub fn get_last_hash(&self) -> Result<Option<Vec<u8>>> {
        let value = self.chain.get(LAST_HASH_KEY)?;
        Ok(value.map(|hash| hash.to_vec()))
    }

    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        match self.chain.get(hash)? {
            Some(data) => {
                let block = Block::deserialize(&data)?;
                log::debug!("Loaded block {}", hex::encode(hash));
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// Writes the genesis block and points the tip marker at it, unless a tip
    /// marker is already present.
    pub fn insert_genesis(&self, block: &Block) -> Result<()> {
        let data = block.serialize()?;

        let result: TransactionResult<(), LedgerError> = self.chain.transaction(|tx| {
            if tx.get(LAST_HASH_KEY)?.is_some() {
                return Err(ConflictableTransactionError::Abort(LedgerError::AlreadyExists));
            }
            tx.insert(block.hash.as_slice(), data.as_slice())?;
            tx.insert(LAST_HASH_KEY, block.hash.as_slice())?;
            Ok(())
        });
        result?;

        self.flush()?;
        log::debug!("💾 Saved genesis block {}", block.hash_hex());
        Ok(())
    }

    /// Writes `block` and moves the tip marker to it in one transaction. The
    /// commit is refused if the tip is no longer `expected_tip`.
    pub fn commit_block(&self, block: &Block, expected_tip: &[u8]) -> Result<()> {
        let data = block.serialize()?;

        let result: TransactionResult<(), LedgerError> = self.chain.transaction(|tx| {
            let current = tx.get(LAST_HASH_KEY)?;
            if current.as_deref() != Some(expected_tip) {
                return Err(ConflictableTransactionError::Abort(LedgerError::Storage(format!(
                    "chain tip moved while mining on {}",
                    hex::encode(expected_tip)
                ))));
            }
            tx.insert(block.hash.as_slice(), data.as_slice())?;
            tx.insert(LAST_HASH_KEY, block.hash.as_slice())?;
            Ok(())
        });
        result?;

        self.flush()?;
        log::debug!("💾 Saved block {}", block.hash_hex());
        Ok(())
    }

    /// Number of stored block records, excluding the tip marker.
    pub fn block_count(&self) -> Result<usize> {
        let mut count = 0;
        for item in self.chain.iter() {
            let (key, _) = item?;
            if &key[..] != LAST_HASH_KEY {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()
            .map_err(|e| LedgerError::Storage(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}
