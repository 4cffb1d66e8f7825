use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents};

pub type TransactionId = Uuid;

/// Number of entries shown on a mini statement.
pub const MINI_STATEMENT_SIZE: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::TransferIn => "Transfer In",
            TransactionType::TransferOut => "Transfer Out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', " ").as_str() {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" | "withdraw" => Some(TransactionType::Withdrawal),
            "transfer in" => Some(TransactionType::TransferIn),
            "transfer out" => Some(TransactionType::TransferOut),
            _ => None,
        }
    }

    /// True for entries that add to the account balance.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionType::Deposit | TransactionType::TransferIn)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A journal entry on one account. Entries are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Journal-wide ordering, assigned by the ledger.
    pub sequence: i64,
    pub account_id: AccountId,
    pub transaction_type: TransactionType,
    /// Always positive; direction comes from `transaction_type`.
    pub amount: Cents,
    pub balance_after: Cents,
    pub description: Option<String>,
    /// Counterparty account number for transfers.
    pub reference_account: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        account_id: AccountId,
        transaction_type: TransactionType,
        amount: Cents,
        balance_after: Cents,
    ) -> Self {
        assert!(amount > 0, "Transaction amount must be positive");
        Self {
            id: Uuid::new_v4(),
            sequence: 0,
            account_id,
            transaction_type,
            amount,
            balance_after,
            description: None,
            reference_account: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reference(mut self, account_number: impl Into<String>) -> Self {
        self.reference_account = Some(account_number.into());
        self
    }

    /// Amount with the sign it contributes to the balance.
    pub fn signed_amount(&self) -> Cents {
        if self.transaction_type.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amount() {
        let account = Uuid::new_v4();
        let deposit = Transaction::new(account, TransactionType::Deposit, 500, 500);
        let withdrawal = Transaction::new(account, TransactionType::Withdrawal, 200, 300);
        let transfer_in = Transaction::new(account, TransactionType::TransferIn, 50, 350);
        let transfer_out = Transaction::new(account, TransactionType::TransferOut, 25, 325);

        assert_eq!(deposit.signed_amount(), 500);
        assert_eq!(withdrawal.signed_amount(), -200);
        assert_eq!(transfer_in.signed_amount(), 50);
        assert_eq!(transfer_out.signed_amount(), -25);
    }

    #[test]
    fn test_type_names_are_stable() {
        for t in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::TransferIn,
            TransactionType::TransferOut,
        ] {
            assert_eq!(TransactionType::from_str(t.as_str()), Some(t));
        }
        assert_eq!(
            TransactionType::from_str("TRANSFER_OUT"),
            Some(TransactionType::TransferOut)
        );
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        Transaction::new(Uuid::new_v4(), TransactionType::Deposit, 0, 0);
    }
}
