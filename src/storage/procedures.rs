//! Ledger procedures.
//!
//! Every balance change goes through one of the four routines below:
//! `open_account`, `deposit_money`, `withdraw_money` and `transfer_money`.
//! Each runs inside a single database transaction. On any error the
//! transaction is dropped without commit, so either every row it touched is
//! written or none is.

use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    AccountId, AccountStatus, AccountType, Cents, CustomerId, CustomerStatus, Transaction,
    TransactionType, account_number_from_counter,
};

use super::{Repository, format_timestamp};

/// Failures reported by the ledger procedures.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account is not active: {0}")]
    AccountInactive(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Customer is not active: {0}")]
    CustomerInactive(CustomerId),

    #[error("Insufficient funds in {account_number}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_number: String,
        balance: Cents,
        requested: Cents,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(Cents),

    #[error("Balance of {account_number} cannot hold another {amount}")]
    BalanceOverflow {
        account_number: String,
        amount: Cents,
    },

    #[error("Cannot transfer to the same account: {0}")]
    SameAccount(String),

    #[error("Ledger database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Journal entry description used for the opening deposit.
pub const INITIAL_DEPOSIT_DESCRIPTION: &str = "Initial Deposit";

/// The slice of an account row a procedure needs to validate and update it.
struct LedgerAccount {
    id: AccountId,
    number: String,
    balance: Cents,
    status: AccountStatus,
}

impl LedgerAccount {
    fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.status != AccountStatus::Active {
            return Err(LedgerError::AccountInactive(self.number.clone()));
        }
        Ok(())
    }

    /// Balance after adding `amount`.
    fn credit(&self, amount: Cents) -> Result<Cents, LedgerError> {
        self.balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account_number: self.number.clone(),
                amount,
            })
    }
}

impl Repository {
    /// `open_account(customer_id, type, amount) -> account_number`
    pub async fn open_account(
        &self,
        customer_id: CustomerId,
        account_type: AccountType,
        initial_deposit: Cents,
    ) -> Result<String, LedgerError> {
        if initial_deposit < 0 {
            return Err(LedgerError::InvalidAmount(initial_deposit));
        }

        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM customers WHERE customer_id = ?")
                .bind(customer_id.to_string())
                .fetch_optional(&mut *tx)
                .await?;
        match status.as_deref().and_then(CustomerStatus::from_str) {
            None => return Err(LedgerError::CustomerNotFound(customer_id)),
            Some(CustomerStatus::Inactive) => {
                return Err(LedgerError::CustomerInactive(customer_id));
            }
            Some(CustomerStatus::Active) => {}
        }

        let counter = next_counter(&mut tx, "account_number").await?;
        let account_number = account_number_from_counter(counter);
        let account_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO accounts (account_id, account_number, customer_id, account_type, balance, interest_rate, status, created_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account_id.to_string())
        .bind(&account_number)
        .bind(customer_id.to_string())
        .bind(account_type.as_str())
        .bind(initial_deposit)
        .bind(account_type.default_interest_rate())
        .bind(AccountStatus::Active.as_str())
        .bind(format_timestamp(Utc::now()))
        .execute(&mut *tx)
        .await?;

        if initial_deposit > 0 {
            let mut entry = Transaction::new(
                account_id,
                TransactionType::Deposit,
                initial_deposit,
                initial_deposit,
            )
            .with_description(INITIAL_DEPOSIT_DESCRIPTION);
            append_entry(&mut tx, &mut entry).await?;
        }

        tx.commit().await?;
        Ok(account_number)
    }

    /// `deposit_money(account_number, amount, description)`
    pub async fn deposit_money(
        &self,
        account_number: &str,
        amount: Cents,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        ensure_positive(amount)?;

        let mut tx = self.pool.begin().await?;

        let account = load_account(&mut tx, account_number).await?;
        account.ensure_active()?;

        let balance_after = account.credit(amount)?;
        set_balance(&mut tx, account.id, balance_after).await?;

        let mut entry = Transaction::new(account.id, TransactionType::Deposit, amount, balance_after)
            .with_description(description);
        append_entry(&mut tx, &mut entry).await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// `withdraw_money(account_number, amount, description)`
    pub async fn withdraw_money(
        &self,
        account_number: &str,
        amount: Cents,
        description: &str,
    ) -> Result<Transaction, LedgerError> {
        ensure_positive(amount)?;

        let mut tx = self.pool.begin().await?;

        let account = load_account(&mut tx, account_number).await?;
        account.ensure_active()?;

        if account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_number: account.number,
                balance: account.balance,
                requested: amount,
            });
        }

        let balance_after = account.balance - amount;
        set_balance(&mut tx, account.id, balance_after).await?;

        let mut entry =
            Transaction::new(account.id, TransactionType::Withdrawal, amount, balance_after)
                .with_description(description);
        append_entry(&mut tx, &mut entry).await?;

        tx.commit().await?;
        Ok(entry)
    }

    /// `transfer_money(from_account, to_account, amount)`
    ///
    /// Appends a Transfer Out on the source and a Transfer In on the
    /// destination, or nothing.
    pub async fn transfer_money(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Cents,
    ) -> Result<(Transaction, Transaction), LedgerError> {
        ensure_positive(amount)?;
        if from_account == to_account {
            return Err(LedgerError::SameAccount(from_account.to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let source = load_account(&mut tx, from_account).await?;
        let destination = load_account(&mut tx, to_account).await?;
        source.ensure_active()?;
        destination.ensure_active()?;

        if source.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account_number: source.number,
                balance: source.balance,
                requested: amount,
            });
        }

        let source_after = source.balance - amount;
        let destination_after = destination.credit(amount)?;

        set_balance(&mut tx, source.id, source_after).await?;
        set_balance(&mut tx, destination.id, destination_after).await?;

        let now = Utc::now();
        let mut debit =
            Transaction::new(source.id, TransactionType::TransferOut, amount, source_after)
                .with_description(format!("Transfer to {}", destination.number))
                .with_reference(destination.number.clone());
        debit.timestamp = now;
        let mut credit = Transaction::new(
            destination.id,
            TransactionType::TransferIn,
            amount,
            destination_after,
        )
        .with_description(format!("Transfer from {}", source.number))
        .with_reference(source.number.clone());
        credit.timestamp = now;

        append_entry(&mut tx, &mut debit).await?;
        append_entry(&mut tx, &mut credit).await?;

        tx.commit().await?;
        Ok((debit, credit))
    }
}

fn ensure_positive(amount: Cents) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

async fn load_account(
    conn: &mut SqliteConnection,
    account_number: &str,
) -> Result<LedgerAccount, LedgerError> {
    let row = sqlx::query(
        "SELECT account_id, account_number, balance, status FROM accounts WHERE account_number = ?",
    )
    .bind(account_number)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| LedgerError::AccountNotFound(account_number.to_string()))?;

    let id_str: String = row.get("account_id");
    let status_str: String = row.get("status");

    Ok(LedgerAccount {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| LedgerError::Database(sqlx::Error::Decode(Box::new(e))))?,
        number: row.get("account_number"),
        balance: row.get("balance"),
        // Anything unrecognised is treated as not tradable.
        status: AccountStatus::from_str(&status_str).unwrap_or(AccountStatus::Inactive),
    })
}

async fn set_balance(
    conn: &mut SqliteConnection,
    account_id: AccountId,
    balance: Cents,
) -> Result<(), LedgerError> {
    sqlx::query("UPDATE accounts SET balance = ? WHERE account_id = ?")
        .bind(balance)
        .bind(account_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn next_counter(conn: &mut SqliteConnection, name: &str) -> Result<i64, LedgerError> {
    let row = sqlx::query(
        r#"
        UPDATE sequence_counter
        SET value = value + 1
        WHERE name = ?
        RETURNING value
        "#,
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get("value"))
}

/// Assign the next journal sequence number and insert the entry.
async fn append_entry(
    conn: &mut SqliteConnection,
    entry: &mut Transaction,
) -> Result<(), LedgerError> {
    entry.sequence = next_counter(conn, "transaction_sequence").await?;

    sqlx::query(
        r#"
        INSERT INTO transactions (transaction_id, sequence, account_id, transaction_type, amount, balance_after, description, reference_account, transaction_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.id.to_string())
    .bind(entry.sequence)
    .bind(entry.account_id.to_string())
    .bind(entry.transaction_type.as_str())
    .bind(entry.amount)
    .bind(entry.balance_after)
    .bind(&entry.description)
    .bind(&entry.reference_account)
    .bind(format_timestamp(entry.timestamp))
    .execute(&mut *conn)
    .await?;

    Ok(())
}
