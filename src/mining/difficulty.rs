use crate::crypto::hash::Hash256;
use crate::{LedgerError, Result};

/// Default number of leading zero bits required of a block hash.
pub const DIFFICULTY: u32 = 16;

/// The threshold `2^(256 - difficulty)` a block digest must stay strictly below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyTarget {
    pub difficulty: u32,
    pub target: Hash256,
}

impl DifficultyTarget {
    pub fn new(difficulty: u32) -> Result<Self> {
        if !(1..=255).contains(&difficulty) {
            return Err(LedgerError::InvalidInput(format!(
                "difficulty must be between 1 and 255, got {}",
                difficulty
            )));
        }

        // Single set bit at position 256 - difficulty, counted from the LSB
        let bit = (256 - difficulty) as usize;
        let mut target = [0u8; 32];
        target[31 - bit / 8] = 1 << (bit % 8);

        Ok(Self {
            difficulty,
            target: Hash256::new(target),
        })
    }

    pub fn is_met_by(&self, hash: &Hash256) -> bool {
        hash < &self.target
    }

    /// Average number of nonces tried before a hit.
    pub fn expected_attempts(&self) -> f64 {
        2f64.powi(self.difficulty as i32)
    }
}

impl Default for DifficultyTarget {
    fn default() -> Self {
        let mut target = [0u8; 32];
        target[1] = 0x01;
        Self {
            difficulty: DIFFICULTY,
            target: Hash256::new(target),
        }
    }
}
