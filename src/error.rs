use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger already exists")]
    AlreadyExists,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Mining error: {0}")]
    Mining(String),

    #[error("Value overflow: {0}")]
    ValueOverflow(String),

    #[error("Invalid chain: {0}")]
    InvalidChain(String),
}

impl LedgerError {
    /// True for failures raised by the storage layer, including records that
    /// could not be decoded and commits that lost a race on the tip marker.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            LedgerError::Storage(_) | LedgerError::Database(_) | LedgerError::Serialization(_)
        )
    }
}

impl From<sled::transaction::TransactionError<LedgerError>> for LedgerError {
    fn from(err: sled::transaction::TransactionError<LedgerError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(e) => e,
            sled::transaction::TransactionError::Storage(e) => LedgerError::Database(e),
        }
    }
}
