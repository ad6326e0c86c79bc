//! Error types for wallet ledger operations.

use thiserror::Error;

use crate::Amount;
use crate::model::{TransactionStatus, TxId, UserId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(Amount),

    #[error("{0} must not be empty")]
    MissingDetail(&'static str),

    #[error("transaction {0} not found")]
    TransactionNotFound(TxId),

    #[error("transaction {0} is not pending (already {1})")]
    NotPending(TxId, TransactionStatus),

    #[error("balance of user {0} would overflow")]
    BalanceOverflow(UserId),

    #[error("insufficient balance for user {user}: available {available}, required {required}")]
    InsufficientBalance {
        user: UserId,
        available: Amount,
        required: Amount,
    },
}
