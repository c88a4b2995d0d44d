use crate::core::{Block, Transaction};
use crate::core::utxo::UtxoSet;
use crate::mining::pow;
use crate::storage::Database;
use crate::{LedgerError, Result};
use std::sync::Arc;

/// Append-only chain of mined blocks backed by a [`Database`].
#[derive(Debug, Clone)]
pub struct Blockchain {
    last_hash: Vec<u8>,
    difficulty: u32,
    db: Arc<Database>,
}

/// Outcome of walking the whole chain and re-checking every block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    pub blocks: usize,
    /// Hash of the first block (walking from the tip) that failed a check.
    pub invalid_block: Option<Vec<u8>>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.invalid_block.is_none()
    }
}

impl Blockchain {
    /// Creates a new ledger whose genesis block pays the coinbase reward to
    /// `address`. Fails with `AlreadyExists` if the store already has a tip.
    pub fn init(db: Arc<Database>, address: &str, memo: &str, difficulty: u32) -> Result<Self> {
        if db.get_last_hash()?.is_some() {
            return Err(LedgerError::AlreadyExists);
        }

        let coinbase = Transaction::new_coinbase(address, memo);
        let genesis = Block::genesis(coinbase, difficulty)?;
        db.insert_genesis(&genesis)?;

        log::info!("✅ Genesis block {} created for {}", genesis.hash_hex(), address);

        Ok(Self {
            last_hash: genesis.hash,
            difficulty,
            db,
        })
    }

    /// Opens a ledger that was initialised earlier.
    pub fn open(db: Arc<Database>, difficulty: u32) -> Result<Self> {
        let last_hash = db.get_last_hash()?
            .ok_or_else(|| LedgerError::NotFound("no chain tip; initialise the ledger first".to_string()))?;

        log::debug!("Opened chain at tip {}", hex::encode(&last_hash));

        Ok(Self {
            last_hash,
            difficulty,
            db,
        })
    }

    /// Mines a block holding `transactions` on top of the stored tip and
    /// commits it together with the new tip marker.
    pub fn add_block(&mut self, transactions: Vec<Transaction>) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidInput("a block needs at least one transaction".to_string()));
        }

        let tip = self.db.get_last_hash()?
            .ok_or_else(|| LedgerError::NotFound("chain tip".to_string()))?;

        let block = Block::create(transactions, tip.clone(), self.difficulty)?;
        self.db.commit_block(&block, &tip)?;
        self.last_hash = block.hash.clone();

        log::info!(
            "✅ Block {} added with {} transaction(s)",
            block.hash_hex(),
            block.transaction_count()
        );
        Ok(block)
    }

    /// Walks from the newest block back to genesis.
    pub fn iter(&self) -> ChainIterator {
        ChainIterator {
            current_hash: Some(self.last_hash.clone()),
            db: self.db.clone(),
        }
    }

    pub fn utxo_set(&self) -> UtxoSet<'_> {
        UtxoSet::new(self)
    }

    pub fn last_hash(&self) -> &[u8] {
        &self.last_hash
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Zero for a chain holding only the genesis block.
    pub fn height(&self) -> Result<u64> {
        let mut blocks = 0u64;
        for block in self.iter() {
            block?;
            blocks += 1;
        }
        Ok(blocks.saturating_sub(1))
    }

    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        self.db.get_block(hash)
    }

    /// Re-checks proof of work and back-links for every block.
    pub fn validate_chain(&self) -> Result<ChainReport> {
        let mut blocks = 0;
        let mut expected_hash = self.last_hash.clone();

        for block in self.iter() {
            let block = block?;
            blocks += 1;

            if block.hash != expected_hash || !pow::validate(&block, self.difficulty)? {
                log::warn!("Block {} failed validation", block.hash_hex());
                return Ok(ChainReport {
                    blocks,
                    invalid_block: Some(block.hash),
                });
            }

            expected_hash = block.prev_hash;
        }

        Ok(ChainReport {
            blocks,
            invalid_block: None,
        })
    }
}

/// Cursor over the chain, newest first. The starting tip is fixed when the
/// iterator is created; blocks appended afterwards are not visited.
#[derive(Debug)]
pub struct ChainIterator {
    current_hash: Option<Vec<u8>>,
    db: Arc<Database>,
}

impl Iterator for ChainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.current_hash.take()?;

        match self.db.get_block(&hash) {
            Ok(Some(block)) => {
                if !block.is_genesis() {
                    self.current_hash = Some(block.prev_hash.clone());
                }
                Some(Ok(block))
            }
            Ok(None) => Some(Err(LedgerError::NotFound(format!("block {}", hex::encode(&hash))))),
            Err(e) => Some(Err(e)),
        }
    }
}

impl std::iter::FusedIterator for ChainIterator {}
