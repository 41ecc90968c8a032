use thiserror::Error;

use crate::account::AccountId;

pub type CResult<T> = Result<T, Error>;

/// Errors raised by the stores, the seeder and the prober.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised by the MongoDB driver: connectivity, server selection, command failures.
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    /// The endpoint cannot be turned into a client.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// Another open transaction already holds a write on the document.
    #[error("write conflict on account {0}: the document is being modified by another transaction")]
    WriteConflict(AccountId),

    /// Transaction lifecycle misuse, e.g. committing without a started transaction.
    #[error("transaction state: {0}")]
    TransactionState(String),

    #[error("store failure: {0}")]
    Store(String),
}

impl Error {
    /// A write conflict surfaced either by the in-memory store or by the server.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            Error::WriteConflict(_) => true,
            Error::Mongo(e) => e.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR),
            _ => false,
        }
    }
}
