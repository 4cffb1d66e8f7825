use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountDetail, AccountId, AccountStatus, AccountSummary, AccountType, BankStats,
    ContactUpdate, Customer, CustomerId, CustomerRole, CustomerStatus, Transaction, TransactionType,
};

use super::{MIGRATION_001_INITIAL, format_timestamp, parse_timestamp};

const CUSTOMER_COLUMNS: &str =
    "customer_id, full_name, email, phone, address, date_of_birth, created_date, status, role";

const ACCOUNT_COLUMNS: &str = "a.account_id, a.account_number, a.customer_id, a.account_type, a.balance, a.interest_rate, a.status, a.created_date";

const TRANSACTION_COLUMNS: &str = "t.transaction_id, t.sequence, t.account_id, t.transaction_type, t.amount, t.balance_after, t.description, t.reference_account, t.transaction_date";

/// Repository for the customer, account and transaction tables.
///
/// Reads go straight through here. Balance-changing writes go through the
/// ledger procedures in `procedures.rs`, which share this connection pool.
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database file at `path` over a single connection.
    /// With `create` the file is created when missing.
    pub async fn connect(path: &str, create: bool) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database {}", path))?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect, creating the file, then migrate).
    pub async fn init(path: &str) -> Result<Self> {
        let repo = Self::connect(path, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Customer operations
    // ========================

    /// Insert a new customer together with its credential hash.
    pub async fn save_customer(&self, customer: &Customer, password_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (customer_id, full_name, email, phone, address, date_of_birth, created_date, password_hash, status, role)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(customer.id.to_string())
        .bind(&customer.full_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.date_of_birth.format("%Y-%m-%d").to_string())
        .bind(format_timestamp(customer.created_at))
        .bind(password_hash)
        .bind(customer.status.as_str())
        .bind(customer.role.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    /// Look up a customer and stored credential hash by email.
    pub async fn find_credentials(&self, email: &str) -> Result<Option<(Customer, String)>> {
        let query = format!(
            "SELECT {}, password_hash FROM customers WHERE email = ?",
            CUSTOMER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer credentials")?;

        match row {
            Some(row) => {
                let hash: String = row.get("password_hash");
                Ok(Some((Self::row_to_customer(&row)?, hash)))
            }
            None => Ok(None),
        }
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let query = format!(
            "SELECT {} FROM customers WHERE customer_id = ?",
            CUSTOMER_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email")?;
        Ok(count > 0)
    }

    /// Apply a contact update. Fields left as `None` keep their stored value.
    /// Returns the number of rows touched (0 when the customer does not exist).
    pub async fn update_contact(&self, id: CustomerId, update: &ContactUpdate) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET phone = COALESCE(?, phone),
                address = COALESCE(?, address)
            WHERE customer_id = ?
            "#,
        )
        .bind(&update.phone)
        .bind(&update.address)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to update customer contact info")?;

        Ok(result.rows_affected())
    }

    /// Set a customer's status. Used by administration and tests.
    pub async fn set_customer_status(&self, id: CustomerId, status: CustomerStatus) -> Result<()> {
        sqlx::query("UPDATE customers SET status = ? WHERE customer_id = ?")
            .bind(status.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update customer status")?;
        Ok(())
    }

    fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        let id_str: String = row.get("customer_id");
        let dob_str: String = row.get("date_of_birth");
        let created_str: String = row.get("created_date");
        let status_str: String = row.get("status");
        let role_str: String = row.get("role");

        Ok(Customer {
            id: Uuid::parse_str(&id_str).context("Invalid customer ID")?,
            full_name: row.get("full_name"),
            email: row.get("email"),
            phone: row.get("phone"),
            address: row.get("address"),
            date_of_birth: NaiveDate::parse_from_str(&dob_str, "%Y-%m-%d")
                .context("Invalid date of birth")?,
            created_at: parse_timestamp(&created_str)?,
            status: CustomerStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid customer status: {}", status_str))?,
            role: CustomerRole::from_str(&role_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid customer role: {}", role_str))?,
        })
    }

    // ========================
    // Account operations
    // ========================

    /// List a customer's accounts, newest first.
    pub async fn list_accounts(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        let query = format!(
            r#"
            SELECT {}
            FROM accounts a
            WHERE a.customer_id = ?
            ORDER BY a.created_date DESC, a.rowid DESC
            "#,
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(customer_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Get an account by its external number.
    pub async fn get_account_by_number(&self, account_number: &str) -> Result<Option<Account>> {
        let query = format!(
            "SELECT {} FROM accounts a WHERE a.account_number = ?",
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(account_number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Get an account joined with its owner's contact details.
    pub async fn get_account_detail(&self, account_number: &str) -> Result<Option<AccountDetail>> {
        let query = format!(
            r#"
            SELECT {}, c.full_name, c.email, c.phone
            FROM accounts a
            JOIN customers c ON a.customer_id = c.customer_id
            WHERE a.account_number = ?
            "#,
            ACCOUNT_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(account_number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account detail")?;

        match row {
            Some(row) => Ok(Some(AccountDetail {
                account: Self::row_to_account(&row)?,
                customer_name: row.get("full_name"),
                email: row.get("email"),
                phone: row.get("phone"),
            })),
            None => Ok(None),
        }
    }

    /// Set an account's status. The ledger procedures refuse inactive accounts.
    pub async fn set_account_status(&self, account_number: &str, status: AccountStatus) -> Result<u64> {
        let result = sqlx::query("UPDATE accounts SET status = ? WHERE account_number = ?")
            .bind(status.as_str())
            .bind(account_number)
            .execute(&self.pool)
            .await
            .context("Failed to update account status")?;
        Ok(result.rows_affected())
    }

    /// Aggregate over a customer's active accounts.
    pub async fn account_summary(&self, customer_id: CustomerId) -> Result<AccountSummary> {
        let customer_id = customer_id.to_string();

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(a.account_id) as account_count,
                COALESCE(SUM(a.balance), 0) as total_balance,
                (SELECT COUNT(*)
                 FROM transactions t
                 JOIN accounts a2 ON t.account_id = a2.account_id
                 WHERE a2.customer_id = ? AND a2.status = 'Active') as transaction_count
            FROM accounts a
            WHERE a.customer_id = ? AND a.status = 'Active'
            "#,
        )
        .bind(&customer_id)
        .bind(&customer_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute account summary")?;

        Ok(AccountSummary {
            account_count: row.get("account_count"),
            total_balance: row.get("total_balance"),
            transaction_count: row.get("transaction_count"),
        })
    }

    /// System-wide totals: active accounts, balance over all accounts, journal size.
    pub async fn bank_stats(&self) -> Result<BankStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM accounts WHERE status = 'Active') as active_accounts,
                (SELECT COALESCE(SUM(balance), 0) FROM accounts) as total_balance,
                (SELECT COUNT(*) FROM transactions) as total_transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute bank statistics")?;

        Ok(BankStats {
            active_accounts: row.get("active_accounts"),
            total_balance: row.get("total_balance"),
            total_transactions: row.get("total_transactions"),
        })
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let id_str: String = row.get("account_id");
        let customer_str: String = row.get("customer_id");
        let type_str: String = row.get("account_type");
        let status_str: String = row.get("status");
        let created_str: String = row.get("created_date");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            account_number: row.get("account_number"),
            customer_id: Uuid::parse_str(&customer_str).context("Invalid customer ID")?,
            account_type: AccountType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account type: {}", type_str))?,
            balance: row.get("balance"),
            interest_rate: row.get("interest_rate"),
            status: AccountStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
            created_at: parse_timestamp(&created_str)?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// Most recent transactions for an account, newest first.
    /// An unknown account number yields an empty list.
    pub async fn list_transactions(&self, account_number: &str, limit: u32) -> Result<Vec<Transaction>> {
        let query = format!(
            r#"
            SELECT {}
            FROM transactions t
            JOIN accounts a ON t.account_id = a.account_id
            WHERE a.account_number = ?
            ORDER BY t.transaction_date DESC, t.sequence DESC
            LIMIT ?
            "#,
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(account_number)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Full journal of one account in sequence order.
    pub async fn journal_for_account(&self, account_id: AccountId) -> Result<Vec<Transaction>> {
        let query = format!(
            "SELECT {} FROM transactions t WHERE t.account_id = ? ORDER BY t.sequence",
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(account_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to load account journal")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("transaction_id");
        let account_str: String = row.get("account_id");
        let type_str: String = row.get("transaction_type");
        let date_str: String = row.get("transaction_date");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            account_id: Uuid::parse_str(&account_str).context("Invalid account ID")?,
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            amount: row.get("amount"),
            balance_after: row.get("balance_after"),
            description: row.get("description"),
            reference_account: row.get("reference_account"),
            timestamp: parse_timestamp(&date_str)?,
        })
    }
}
