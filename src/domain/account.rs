use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, CustomerId};

pub type AccountId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    Savings,
    Current,
    FixedDeposit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "Savings",
            AccountType::Current => "Current",
            AccountType::FixedDeposit => "Fixed Deposit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "savings" => Some(AccountType::Savings),
            "current" => Some(AccountType::Current),
            "fixed deposit" | "fd" => Some(AccountType::FixedDeposit),
            _ => None,
        }
    }

    /// Annual interest rate in percent applied when the account is opened.
    pub fn default_interest_rate(&self) -> f64 {
        match self {
            AccountType::Savings => 4.0,
            AccountType::Current => 0.0,
            AccountType::FixedDeposit => 6.5,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Inactive => "Inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A bank account. `balance` is owned by the ledger procedures and is never
/// written directly by the data-access layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub account_number: String,
    pub customer_id: CustomerId,
    pub account_type: AccountType,
    pub balance: Cents,
    pub interest_rate: f64,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// An account joined with its owner's contact details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetail {
    pub account: Account,
    pub customer_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Aggregate over a customer's active accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub account_count: i64,
    pub total_balance: Cents,
    pub transaction_count: i64,
}

/// System-wide figures for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankStats {
    pub active_accounts: i64,
    pub total_balance: Cents,
    pub total_transactions: i64,
}

/// Build an external account number from the counter value.
pub fn account_number_from_counter(value: i64) -> String {
    format!("ACC{:010}", value)
}
