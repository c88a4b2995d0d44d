//! Core ledger components

pub mod blockchain;
pub mod block;
pub mod transaction;
pub mod utxo;

pub use blockchain::{Blockchain, ChainIterator, ChainReport};
pub use block::Block;
pub use transaction::{Transaction, TxInput, TxOutput, COINBASE_REWARD};
pub use utxo::{SpendableOutputs, UnspentEntry, UtxoSet};
