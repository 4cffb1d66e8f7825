use thiserror::Error;

use crate::domain::CustomerId;
use crate::storage::LedgerError;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Could not connect to database: {0}")]
    Connection(anyhow::Error),

    #[error("Invalid email or password, or customer is inactive")]
    AuthenticationFailure,

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account {0} does not belong to the current customer")]
    AccessDenied(String),

    #[error("This command requires the administrator login")]
    AdminRequired,

    #[error(transparent)]
    Procedure(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl BankError {
    pub fn validation(message: impl Into<String>) -> Self {
        BankError::Validation(message.into())
    }

    /// True when the ledger refused the operation on business grounds
    /// (as opposed to an infrastructure failure).
    pub fn is_rejection(&self) -> bool {
        match self {
            BankError::Procedure(LedgerError::Database(_)) => false,
            BankError::Procedure(_)
            | BankError::Validation(_)
            | BankError::DuplicateEmail(_)
            | BankError::AuthenticationFailure
            | BankError::AccessDenied(_)
            | BankError::AdminRequired
            | BankError::AccountNotFound(_)
            | BankError::CustomerNotFound(_) => true,
            BankError::Connection(_) | BankError::Database(_) => false,
        }
    }
}
