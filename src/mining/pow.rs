use crate::core::{Block, Transaction};
use crate::crypto::hash::Hash256;
use crate::mining::difficulty::DifficultyTarget;
use crate::{LedgerError, Result};
use std::time::Instant;

/// Upper bound of the nonce search.
pub const MAX_NONCE: u64 = i64::MAX as u64;

const PROGRESS_INTERVAL: u64 = 1 << 20;

/// Nonce search over `prev_hash ‖ H(tx ids) ‖ nonce ‖ difficulty`.
#[derive(Debug, Clone)]
pub struct ProofOfWork<'a> {
    prev_hash: &'a [u8],
    tx_hash: Hash256,
    target: DifficultyTarget,
}

impl<'a> ProofOfWork<'a> {
    pub fn new(prev_hash: &'a [u8], transactions: &[Transaction], difficulty: u32) -> Result<Self> {
        Ok(Self {
            prev_hash,
            tx_hash: Block::hash_transactions(transactions),
            target: DifficultyTarget::new(difficulty)?,
        })
    }

    pub fn for_block(block: &'a Block, difficulty: u32) -> Result<Self> {
        Self::new(&block.prev_hash, &block.transactions, difficulty)
    }

    pub fn target(&self) -> &DifficultyTarget {
        &self.target
    }

    pub fn init_data(&self, nonce: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.prev_hash.len() + 32 + 16);
        data.extend_from_slice(self.prev_hash);
        data.extend_from_slice(self.tx_hash.as_bytes());
        data.extend_from_slice(&nonce.to_be_bytes());
        data.extend_from_slice(&u64::from(self.target.difficulty).to_be_bytes());
        data
    }

    /// Tries nonces from zero upwards until the digest falls below the target.
    pub fn run(&self) -> Result<(u64, Hash256)> {
        let started = Instant::now();
        log::debug!(
            "⛏️  Mining at difficulty {} (~{:.0} attempts expected)",
            self.target.difficulty,
            self.target.expected_attempts()
        );

        let mut nonce = 0u64;
        while nonce < MAX_NONCE {
            let hash = Hash256::hash(&self.init_data(nonce));

            if self.target.is_met_by(&hash) {
                log::debug!(
                    "⛏️  Found nonce {} in {:.2}s: {}",
                    nonce,
                    started.elapsed().as_secs_f64(),
                    hash
                );
                return Ok((nonce, hash));
            }

            if nonce > 0 && nonce % PROGRESS_INTERVAL == 0 {
                log::trace!("Mining progress: {} nonces tried, last {}", nonce, hash);
            }

            nonce += 1;
        }

        Err(LedgerError::Mining(format!("no nonce below {} meets the target", MAX_NONCE)))
    }

    /// Recomputes the digest for `nonce`, requiring it to meet the target and
    /// to equal the stored `hash`.
    pub fn validate(&self, nonce: u64, hash: &[u8]) -> bool {
        let digest = Hash256::hash(&self.init_data(nonce));
        self.target.is_met_by(&digest) && digest.as_bytes()[..] == *hash
    }
}

pub fn mine(prev_hash: &[u8], transactions: &[Transaction], difficulty: u32) -> Result<(u64, Hash256)> {
    ProofOfWork::new(prev_hash, transactions, difficulty)?.run()
}

pub fn validate(block: &Block, difficulty: u32) -> Result<bool> {
    Ok(ProofOfWork::for_block(block, difficulty)?.validate(block.nonce, &block.hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DIFFICULTY: u32 = 8;

    fn sample_transactions() -> Vec<Transaction> {
        vec![Transaction::new_coinbase("Alice", "pow test")]
    }

    #[test]
    fn test_mined_nonce_validates() -> Result<()> {
        let txs = sample_transactions();
        let prev = Hash256::hash(b"parent").to_vec();

        let (nonce, hash) = mine(&prev, &txs, TEST_DIFFICULTY)?;
        let pow = ProofOfWork::new(&prev, &txs, TEST_DIFFICULTY)?;

        assert!(pow.validate(nonce, hash.as_bytes()));
        assert!(pow.target().is_met_by(&hash));
        Ok(())
    }

    #[test]
    fn test_mining_is_deterministic() -> Result<()> {
        let txs = sample_transactions();

        let first = mine(&[], &txs, TEST_DIFFICULTY)?;
        let second = mine(&[], &txs, TEST_DIFFICULTY)?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_first_hit_is_smallest_nonce() -> Result<()> {
        let txs = sample_transactions();
        let pow = ProofOfWork::new(&[], &txs, TEST_DIFFICULTY)?;
        let (nonce, _) = pow.run()?;

        for earlier in 0..nonce {
            let digest = Hash256::hash(&pow.init_data(earlier));
            assert!(!pow.target().is_met_by(&digest));
        }
        Ok(())
    }

    #[test]
    fn test_corrupted_hash_bits_fail() -> Result<()> {
        let txs = sample_transactions();
        let pow = ProofOfWork::new(&[], &txs, TEST_DIFFICULTY)?;
        let (nonce, hash) = pow.run()?;

        for bit in 0..256 {
            let mut corrupted = hash.to_vec();
            corrupted[bit / 8] ^= 1 << (bit % 8);
            assert!(!pow.validate(nonce, &corrupted), "bit {} flip still validated", bit);
        }
        Ok(())
    }

    #[test]
    fn test_incremented_nonce_fails() -> Result<()> {
        let txs = sample_transactions();
        let pow = ProofOfWork::new(&[], &txs, TEST_DIFFICULTY)?;
        let (nonce, hash) = pow.run()?;

        assert!(!pow.validate(nonce + 1, hash.as_bytes()));
        Ok(())
    }

    #[test]
    fn test_init_data_layout() -> Result<()> {
        let txs = sample_transactions();
        let prev = vec![7u8; 32];
        let pow = ProofOfWork::new(&prev, &txs, TEST_DIFFICULTY)?;
        let data = pow.init_data(0x0102);

        assert_eq!(data.len(), 32 + 32 + 8 + 8);
        assert_eq!(&data[..32], &prev[..]);
        assert_eq!(&data[32..64], Block::hash_transactions(&txs).as_bytes());
        assert_eq!(&data[64..72], &[0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(&data[72..], &[0, 0, 0, 0, 0, 0, 0, 8]);
        Ok(())
    }
}
