use anyhow::Context;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::{
    Account, AccountDetail, AccountStatus, AccountSummary, AccountType, BankStats, Cents,
    ContactUpdate, Customer, CustomerId, CustomerRole, CustomerStatus, MINI_STATEMENT_SIZE, NewCustomer,
    Reconciliation, Transaction, format_cents, normalize_email, reconcile,
};
use crate::storage::Repository;

use super::BankError;

pub const DEFAULT_DEPOSIT_DESCRIPTION: &str = "Cash Deposit";
pub const DEFAULT_WITHDRAWAL_DESCRIPTION: &str = "Cash Withdrawal";

const ADMIN_FULL_NAME: &str = "System Administrator";

/// Data-access facade over the bank database.
///
/// Reads are plain queries. Deposits, withdrawals, transfers and account
/// opening are delegated to the ledger procedures, which commit all of their
/// rows or none. Every failure is logged here before it is returned.
pub struct BankService {
    repo: Repository,
    config: Config,
}

/// Both legs of a completed transfer.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    pub debit: Transaction,
    pub credit: Transaction,
}

impl BankService {
    pub fn new(repo: Repository, config: Config) -> Self {
        Self { repo, config }
    }

    /// Create (if needed) and migrate the database named in `config`.
    pub async fn init(config: Config) -> Result<Self, BankError> {
        let repo = Repository::init(&config.database)
            .await
            .map_err(BankError::Connection)
            .inspect_err(|e| error!(database = %config.database, error = %e, "init failed"))?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(config: Config) -> Result<Self, BankError> {
        let repo = Repository::connect(&config.database, false)
            .await
            .map_err(BankError::Connection)
            .inspect_err(|e| error!(database = %config.database, error = %e, "connect failed"))?;
        Ok(Self::new(repo, config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn close(&self) {
        self.repo.close().await;
    }

    // ========================
    // Customers
    // ========================

    /// Match an email and credential against an active customer.
    ///
    /// Unknown emails, wrong credentials and inactive customers all yield
    /// `Ok(None)`; only infrastructure failures are errors.
    pub async fn authenticate(
        &self,
        email: &str,
        credential: &str,
    ) -> Result<Option<Customer>, BankError> {
        let email = normalize_email(email);
        if email.is_empty() || credential.is_empty() {
            return Ok(None);
        }

        let found = report(
            "authenticate",
            self.repo.find_credentials(&email).await.map_err(BankError::from),
        )?;
        let Some((customer, hash)) = found else {
            debug!(%email, "login for unknown email");
            return Ok(None);
        };

        if !customer.is_active() {
            debug!(customer_id = %customer.id, "login for inactive customer");
            return Ok(None);
        }

        match bcrypt::verify(credential, &hash) {
            Ok(true) => {
                info!(customer_id = %customer.id, "customer logged in");
                Ok(Some(customer))
            }
            Ok(false) => {
                debug!(customer_id = %customer.id, "credential mismatch");
                Ok(None)
            }
            Err(e) => {
                warn!(customer_id = %customer.id, error = %e, "stored credential hash is unreadable");
                Ok(None)
            }
        }
    }

    /// Register a new, active customer. The administrator email is reserved.
    pub async fn register_customer(
        &self,
        profile: NewCustomer,
        credential: &str,
    ) -> Result<Customer, BankError> {
        let outcome = async {
            validate_profile(&profile, credential)?;
            if self.config.is_admin_email(&profile.email) {
                return Err(BankError::validation(
                    "this email is reserved for the administrator",
                ));
            }

            let customer = self.insert_customer(Customer::new(profile), credential).await?;
            info!(customer_id = %customer.id, email = %customer.email, "customer registered");
            Ok(customer)
        }
        .await;

        report("register_customer", outcome)
    }

    /// Create the administrator login for `config.admin_email`.
    /// Fails with `DuplicateEmail` when it already exists.
    pub async fn create_admin(&self, credential: &str) -> Result<Customer, BankError> {
        let outcome = async {
            let profile = NewCustomer {
                full_name: ADMIN_FULL_NAME.to_string(),
                email: self.config.admin_email.clone(),
                phone: None,
                address: None,
                date_of_birth: Utc::now().date_naive(),
            };
            validate_profile(&profile, credential)?;

            let mut admin = Customer::new(profile);
            admin.role = CustomerRole::Admin;
            let admin = self.insert_customer(admin, credential).await?;
            info!(customer_id = %admin.id, email = %admin.email, "administrator created");
            Ok::<_, BankError>(admin)
        }
        .await;

        report("create_admin", outcome)
    }

    async fn insert_customer(
        &self,
        customer: Customer,
        credential: &str,
    ) -> Result<Customer, BankError> {
        if self.repo.email_exists(&customer.email).await? {
            return Err(BankError::DuplicateEmail(customer.email));
        }

        let hash = bcrypt::hash(credential, self.config.password_cost)
            .context("Failed to hash credential")?;

        if let Err(e) = self.repo.save_customer(&customer, &hash).await {
            if is_unique_violation(&e) {
                return Err(BankError::DuplicateEmail(customer.email));
            }
            return Err(e.into());
        }
        Ok(customer)
    }

    pub async fn get_customer(&self, customer_id: CustomerId) -> Result<Customer, BankError> {
        let outcome = async {
            self.repo
                .get_customer(customer_id)
                .await?
                .ok_or(BankError::CustomerNotFound(customer_id))
        }
        .await;

        report("get_customer", outcome)
    }

    /// Update phone and/or address. An update with no supplied field is
    /// rejected before any SQL is issued.
    pub async fn update_contact_info(
        &self,
        customer_id: CustomerId,
        update: ContactUpdate,
    ) -> Result<Customer, BankError> {
        let outcome = async {
            if update.is_empty() {
                return Err(BankError::validation("no contact field supplied"));
            }

            if self.repo.update_contact(customer_id, &update).await? == 0 {
                return Err(BankError::CustomerNotFound(customer_id));
            }

            info!(%customer_id, phone = update.phone.is_some(), address = update.address.is_some(), "contact info updated");
            self.repo
                .get_customer(customer_id)
                .await?
                .ok_or(BankError::CustomerNotFound(customer_id))
        }
        .await;

        report("update_contact_info", outcome)
    }

    /// Activate or deactivate a customer by email. Inactive customers cannot log in.
    pub async fn set_customer_status(
        &self,
        email: &str,
        status: CustomerStatus,
    ) -> Result<Customer, BankError> {
        let outcome = async {
            let email = normalize_email(email);
            let (mut customer, _) = self
                .repo
                .find_credentials(&email)
                .await?
                .ok_or_else(|| BankError::validation(format!("no customer with email {}", email)))?;

            self.repo.set_customer_status(customer.id, status).await?;
            customer.status = status;
            info!(customer_id = %customer.id, %status, "customer status changed");
            Ok::<_, BankError>(customer)
        }
        .await;

        report("set_customer_status", outcome)
    }

    // ========================
    // Accounts
    // ========================

    /// Open an account through the `open_account` procedure.
    /// Returns the new account number.
    pub async fn create_account(
        &self,
        customer_id: CustomerId,
        account_type: AccountType,
        initial_deposit: Cents,
    ) -> Result<String, BankError> {
        let outcome = async {
            if initial_deposit < 0 {
                return Err(BankError::validation("initial deposit cannot be negative"));
            }

            let number = self
                .repo
                .open_account(customer_id, account_type, initial_deposit)
                .await?;

            info!(
                %customer_id,
                account_number = %number,
                %account_type,
                initial_deposit = %format_cents(initial_deposit),
                "account opened"
            );
            Ok(number)
        }
        .await;

        report("create_account", outcome)
    }

    /// A customer's accounts, newest first.
    pub async fn list_accounts(&self, customer_id: CustomerId) -> Result<Vec<Account>, BankError> {
        report(
            "list_accounts",
            self.repo.list_accounts(customer_id).await.map_err(BankError::from),
        )
    }

    pub async fn get_account(&self, account_number: &str) -> Result<Option<Account>, BankError> {
        report(
            "get_account",
            self.repo
                .get_account_by_number(account_number.trim())
                .await
                .map_err(BankError::from),
        )
    }

    pub async fn get_account_detail(
        &self,
        account_number: &str,
    ) -> Result<Option<AccountDetail>, BankError> {
        report(
            "get_account_detail",
            self.repo
                .get_account_detail(account_number.trim())
                .await
                .map_err(BankError::from),
        )
    }

    /// Totals over the customer's active accounts.
    pub async fn get_summary(&self, customer_id: CustomerId) -> Result<AccountSummary, BankError> {
        report(
            "get_summary",
            self.repo.account_summary(customer_id).await.map_err(BankError::from),
        )
    }

    /// Figures for the system-wide dashboard.
    pub async fn bank_stats(&self) -> Result<BankStats, BankError> {
        report("bank_stats", self.repo.bank_stats().await.map_err(BankError::from))
    }

    pub async fn set_account_status(
        &self,
        account_number: &str,
        status: AccountStatus,
    ) -> Result<(), BankError> {
        let outcome = async {
            let account_number = account_number.trim();
            if self.repo.set_account_status(account_number, status).await? == 0 {
                return Err(BankError::AccountNotFound(account_number.to_string()));
            }
            info!(%account_number, %status, "account status changed");
            Ok(())
        }
        .await;

        report("set_account_status", outcome)
    }

    // ========================
    // History
    // ========================

    /// Up to `limit` most recent transactions, newest first.
    /// A limit of zero yields an empty list.
    pub async fn get_transactions(
        &self,
        account_number: &str,
        limit: u32,
    ) -> Result<Vec<Transaction>, BankError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        report(
            "get_transactions",
            self.repo
                .list_transactions(account_number.trim(), limit)
                .await
                .map_err(BankError::from),
        )
    }

    /// The last five transactions.
    pub async fn mini_statement(&self, account_number: &str) -> Result<Vec<Transaction>, BankError> {
        self.get_transactions(account_number, MINI_STATEMENT_SIZE).await
    }

    /// Replay an account's journal and compare it with the stored balance.
    pub async fn verify_account(&self, account_number: &str) -> Result<Reconciliation, BankError> {
        let outcome = async {
            let account = self
                .repo
                .get_account_by_number(account_number.trim())
                .await?
                .ok_or_else(|| BankError::AccountNotFound(account_number.trim().to_string()))?;

            let journal = self.repo.journal_for_account(account.id).await?;
            let reconciliation = reconcile(&account.account_number, account.balance, &journal);

            if !reconciliation.is_consistent() {
                warn!(
                    account_number = %account.account_number,
                    stored = reconciliation.stored_balance,
                    replayed = reconciliation.replayed_balance,
                    broken = reconciliation.broken_links.len(),
                    "account journal does not reconcile"
                );
            }
            Ok::<_, BankError>(reconciliation)
        }
        .await;

        report("verify_account", outcome)
    }

    // ========================
    // Money movement
    // ========================

    pub async fn deposit(
        &self,
        account_number: &str,
        amount: Cents,
        description: Option<&str>,
    ) -> Result<Transaction, BankError> {
        let outcome = async {
            validate_amount(amount)?;
            let description = description_or(description, DEFAULT_DEPOSIT_DESCRIPTION);
            let entry = self
                .repo
                .deposit_money(account_number.trim(), amount, &description)
                .await?;

            info!(
                account_number = %account_number.trim(),
                amount = %format_cents(amount),
                balance_after = %format_cents(entry.balance_after),
                "deposit completed"
            );
            Ok::<_, BankError>(entry)
        }
        .await;

        report("deposit", outcome)
    }

    /// Withdraw funds. The `withdraw_money` procedure rejects overdrafts.
    pub async fn withdraw(
        &self,
        account_number: &str,
        amount: Cents,
        description: Option<&str>,
    ) -> Result<Transaction, BankError> {
        let outcome = async {
            validate_amount(amount)?;
            let description = description_or(description, DEFAULT_WITHDRAWAL_DESCRIPTION);
            let entry = self
                .repo
                .withdraw_money(account_number.trim(), amount, &description)
                .await?;

            info!(
                account_number = %account_number.trim(),
                amount = %format_cents(amount),
                balance_after = %format_cents(entry.balance_after),
                "withdrawal completed"
            );
            Ok::<_, BankError>(entry)
        }
        .await;

        report("withdraw", outcome)
    }

    /// Move funds between two accounts, all or nothing.
    pub async fn transfer(
        &self,
        from_account: &str,
        to_account: &str,
        amount: Cents,
    ) -> Result<TransferReceipt, BankError> {
        let outcome = async {
            validate_amount(amount)?;
            let (from_account, to_account) = (from_account.trim(), to_account.trim());
            if to_account.is_empty() {
                return Err(BankError::validation("destination account is required"));
            }

            let (debit, credit) = self
                .repo
                .transfer_money(from_account, to_account, amount)
                .await?;

            info!(
                %from_account,
                %to_account,
                amount = %format_cents(amount),
                "transfer completed"
            );
            Ok(TransferReceipt { debit, credit })
        }
        .await;

        report("transfer", outcome)
    }
}

/// Log a failed operation at the boundary and pass the result through.
fn report<T>(operation: &'static str, result: Result<T, BankError>) -> Result<T, BankError> {
    result.inspect_err(|e| {
        if e.is_rejection() {
            warn!(operation, error = %e, "operation rejected");
        } else {
            error!(operation, error = %e, "operation failed");
        }
    })
}

fn validate_amount(amount: Cents) -> Result<(), BankError> {
    if amount <= 0 {
        return Err(BankError::validation("amount must be positive"));
    }
    Ok(())
}

fn validate_profile(profile: &NewCustomer, credential: &str) -> Result<(), BankError> {
    if profile.full_name.trim().is_empty() {
        return Err(BankError::validation("full name is required"));
    }
    let email = profile.email.trim();
    if email.is_empty() {
        return Err(BankError::validation("email is required"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(BankError::validation(format!("invalid email: {}", email))),
    }
    if credential.is_empty() {
        return Err(BankError::validation("password is required"));
    }
    if profile.date_of_birth > Utc::now().date_naive() {
        return Err(BankError::validation("date of birth is in the future"));
    }
    Ok(())
}

fn description_or(description: Option<&str>, default: &str) -> String {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}
