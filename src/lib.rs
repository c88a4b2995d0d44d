//! PoW Ledger - a single-node proof-of-work ledger
//!
//! This library implements:
//! - Blocks linked by hash and sealed with a SHA-256 proof of work
//! - UTXO-based transactions with coinbase rewards
//! - Unspent output discovery and spend selection over the chain
//! - sled-backed block storage with an atomic tip marker
//! - A command line front end

pub mod core;
pub mod crypto;
pub mod mining;
pub mod storage;
pub mod cli;
pub mod error;
pub mod config;

pub use error::{LedgerError, Result};
