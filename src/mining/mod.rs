//! Proof-of-work search and difficulty targets

pub mod difficulty;
pub mod pow;

pub use difficulty::{DifficultyTarget, DIFFICULTY};
pub use pow::{mine, validate, ProofOfWork};
