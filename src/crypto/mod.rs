//! Hashing primitives for the ledger

pub mod hash;

pub use hash::{Hash256, Hashable};
