mod session;

pub use session::Session;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::BankService;
use crate::config::{Config, DEFAULT_DATABASE};
use crate::domain::{
    AccountStatus, AccountType, Cents, ContactUpdate, CustomerStatus, NewCustomer, Transaction,
    format_amount, parse_cents,
};
use crate::io::{StatementExporter, StatementFormat};

/// Bankdesk - bank account management
#[derive(Parser)]
#[command(name = "bankdesk")]
#[command(about = "Customer and account management over a SQLite ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "BANKDESK_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Customer email used to log in
    #[arg(short, long, global = true, env = "BANKDESK_EMAIL")]
    pub email: Option<String>,

    /// Customer password used to log in
    #[arg(short, long, global = true, env = "BANKDESK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init {
        /// Also create the administrator login with this password
        #[arg(long, env = "BANKDESK_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,
    },

    /// Register a new customer using --email and --password
    Register {
        /// Full name
        #[arg(long)]
        name: String,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        dob: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Postal address
        #[arg(long)]
        address: Option<String>,
    },

    /// Check credentials and show a welcome line
    Login,

    /// Account summary and account list
    Dashboard,

    /// List your accounts
    Accounts,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit money into one of your accounts
    Deposit {
        /// Account number
        account: String,

        /// Amount (e.g., "5000" or "5000.00")
        amount: String,

        /// Description
        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Withdraw money from one of your accounts
    Withdraw {
        /// Account number
        account: String,

        /// Amount (e.g., "2000" or "2000.00")
        amount: String,

        /// Description
        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Transfer money from one of your accounts to any account
    Transfer {
        /// Amount to transfer
        amount: String,

        /// Source account number (must be yours)
        #[arg(long)]
        from: String,

        /// Destination account number
        #[arg(long)]
        to: String,
    },

    /// Show transaction history for one of your accounts
    History {
        /// Account number
        account: String,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<u32>,

        /// Show the mini statement (last 5 transactions)
        #[arg(long, conflicts_with = "limit")]
        mini: bool,
    },

    /// Export an account statement to CSV or JSON
    Statement {
        /// Account number
        account: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Maximum number of transactions to include
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Update your phone number and/or address
    Profile {
        /// New phone number
        #[arg(long)]
        phone: Option<String>,

        /// New postal address
        #[arg(long)]
        address: Option<String>,
    },

    /// Administrator commands
    #[command(subcommand)]
    Admin(AdminCommands),
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Open {
        /// Account type: savings, current, fixed-deposit
        #[arg(short = 't', long = "type")]
        account_type: String,

        /// Initial deposit
        #[arg(long, default_value = "0")]
        deposit: String,
    },

    /// Show account details
    Show {
        /// Account number
        account: String,
    },

    /// Check that the balance matches the transaction history
    Verify {
        /// Account number
        account: String,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// System-wide dashboard
    Stats,

    /// Activate or deactivate an account
    AccountStatus {
        /// Account number
        account: String,

        /// active or inactive
        status: String,
    },

    /// Activate or deactivate a customer
    CustomerStatus {
        /// Customer email
        customer: String,

        /// active or inactive
        status: String,
    },
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "bankdesk=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

impl Cli {
    pub fn config(&self) -> Config {
        Config::new(&self.database)
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.email.as_deref(), self.password.as_deref()) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => anyhow::bail!("--email and --password are required (or BANKDESK_EMAIL / BANKDESK_PASSWORD)"),
        }
    }

    async fn login(&self, service: &BankService) -> Result<Session> {
        let (email, password) = self.credentials()?;
        Ok(Session::login(service, email, password).await?)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config();

        if let Commands::Init { admin_password } = &self.command {
            let service = BankService::init(config).await?;
            println!("Database initialized: {}", self.database);
            if let Some(password) = admin_password {
                let admin = service.create_admin(password).await?;
                println!("Administrator login created: {}", admin.email);
            }
            return Ok(());
        }

        let service = BankService::connect(config).await?;

        if let Commands::Register {
            name,
            dob,
            phone,
            address,
        } = &self.command
        {
            let (email, password) = self.credentials()?;
            let profile = NewCustomer {
                full_name: name.clone(),
                email: email.to_string(),
                phone: phone.clone(),
                address: address.clone(),
                date_of_birth: parse_date(dob)?,
            };
            let customer = service.register_customer(profile, password).await?;
            println!("Registered {} <{}>", customer.full_name, customer.email);
            println!("  Customer ID: {}", customer.id);
            return Ok(());
        }

        let mut session = self.login(&service).await?;

        match self.command {
            Commands::Init { .. } | Commands::Register { .. } => unreachable!("handled above"),

            Commands::Login => {
                println!("Welcome, {}!", session.customer().full_name);
                if session.is_admin() {
                    println!("Administrator access: run `bankdesk admin stats`.");
                } else {
                    println!("You have {} account(s).", session.accounts().len());
                }
            }

            Commands::Dashboard => run_dashboard(&service, &session).await?,

            Commands::Accounts => print_accounts(&session),

            Commands::Account(cmd) => run_account_command(&service, &mut session, cmd).await?,

            Commands::Deposit {
                account,
                amount,
                description,
            } => {
                let account = session.owned_account(&account)?.account_number.clone();
                let amount = parse_amount(&amount)?;
                let entry = service
                    .deposit(&account, amount, description.as_deref())
                    .await?;
                println!("Deposited {} into {}", format_amount(amount), account);
                println!("New balance: {}", format_amount(entry.balance_after));
            }

            Commands::Withdraw {
                account,
                amount,
                description,
            } => {
                let account = session.owned_account(&account)?.account_number.clone();
                let amount = parse_amount(&amount)?;
                let entry = service
                    .withdraw(&account, amount, description.as_deref())
                    .await?;
                println!("Withdrew {} from {}", format_amount(amount), account);
                println!("New balance: {}", format_amount(entry.balance_after));
            }

            Commands::Transfer { amount, from, to } => {
                let from = session.owned_account(&from)?.account_number.clone();
                let to = to.trim().to_string();
                if to.is_empty() {
                    anyhow::bail!("Please enter a destination account number");
                }
                let amount = parse_amount(&amount)?;
                let receipt = service.transfer(&from, &to, amount).await?;
                println!("Transferred {} from {} to {}", format_amount(amount), from, to);
                println!(
                    "New balance of {}: {}",
                    from,
                    format_amount(receipt.debit.balance_after)
                );
            }

            Commands::History {
                account,
                limit,
                mini,
            } => {
                let account = session.owned_account(&account)?.account_number.clone();
                let transactions = if mini {
                    service.mini_statement(&account).await?
                } else {
                    let limit = limit.unwrap_or(service.config().history_limit);
                    service.get_transactions(&account, limit).await?
                };
                let title = if mini { "Mini statement" } else { "Transaction history" };
                println!("{} for {}", title, account);
                print_transactions(&transactions);
            }

            Commands::Statement {
                account,
                output,
                format,
                limit,
            } => {
                let account = session.owned_account(&account)?.account_number.clone();
                let format = StatementFormat::from_str(&format)
                    .with_context(|| format!("Invalid format '{}'. Valid: csv, json", format))?;
                let limit = limit.unwrap_or(service.config().history_limit);
                run_statement_command(&service, &account, output.as_deref(), format, limit)
                    .await?;
            }

            Commands::Profile { phone, address } => {
                let update = ContactUpdate::new(phone, address);
                if update.is_empty() {
                    anyhow::bail!("Nothing to update: pass --phone and/or --address");
                }
                let customer = service
                    .update_contact_info(session.customer().id, update)
                    .await?;
                println!("Contact info updated for {}", customer.full_name);
                println!("  Phone:   {}", customer.phone.as_deref().unwrap_or("-"));
                println!("  Address: {}", customer.address.as_deref().unwrap_or("-"));
                session.set_customer(customer);
            }

            Commands::Admin(cmd) => run_admin_command(&service, &session, cmd).await?,
        }

        Ok(())
    }
}

async fn run_dashboard(service: &BankService, session: &Session) -> Result<()> {
    let summary = service.get_summary(session.customer().id).await?;

    println!("Account Summary for {}", session.customer().full_name);
    println!("  Active accounts:    {}", summary.account_count);
    println!("  Total balance:      {}", format_amount(summary.total_balance));
    println!("  Total transactions: {}", summary.transaction_count);
    println!();
    print_accounts(session);
    Ok(())
}

fn print_accounts(session: &Session) {
    let accounts = session.accounts();
    if accounts.is_empty() {
        println!("No accounts found.");
        return;
    }

    println!(
        "{:<15} {:<14} {:>16} {:>7} {:<9} {:<11}",
        "ACCOUNT", "TYPE", "BALANCE", "RATE", "STATUS", "OPENED"
    );
    println!("{}", "-".repeat(77));
    for account in accounts {
        println!(
            "{:<15} {:<14} {:>16} {:>6.2}% {:<9} {:<11}",
            account.account_number,
            account.account_type,
            format_amount(account.balance),
            account.interest_rate,
            account.status,
            account.created_at.format("%d-%b-%Y").to_string()
        );
    }
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:<20} {:<13} {:>14} {:>16}  {:<30}",
        "DATE", "TYPE", "AMOUNT", "BALANCE", "DESCRIPTION"
    );
    println!("{}", "-".repeat(97));
    for t in transactions {
        println!(
            "{:<20} {:<13} {:>14} {:>16}  {:<30}",
            t.timestamp.format("%d-%b-%Y %H:%M:%S").to_string(),
            t.transaction_type,
            format_amount(t.amount),
            format_amount(t.balance_after),
            truncate(t.description.as_deref().unwrap_or(""), 30)
        );
    }
}

async fn run_account_command(
    service: &BankService,
    session: &mut Session,
    cmd: AccountCommands,
) -> Result<()> {
    match cmd {
        AccountCommands::Open {
            account_type,
            deposit,
        } => {
            let account_type = AccountType::from_str(&account_type).with_context(|| {
                format!(
                    "Invalid account type '{}'. Valid: savings, current, fixed-deposit",
                    account_type
                )
            })?;
            let deposit = parse_cents(&deposit).context("Invalid initial deposit")?;
            if deposit < 0 {
                anyhow::bail!("Initial deposit cannot be negative");
            }

            let number = service
                .create_account(session.customer().id, account_type, deposit)
                .await?;
            session.refresh(service).await?;

            println!("Opened {} account {}", account_type, number);
            println!("  Opening balance: {}", format_amount(deposit));
        }

        AccountCommands::Show { account } => {
            let number = session.owned_account(&account)?.account_number.clone();
            let detail = service
                .get_account_detail(&number)
                .await?
                .with_context(|| format!("Account not found: {}", number))?;

            println!("Account: {}", detail.account.account_number);
            println!("  Holder:        {}", detail.customer_name);
            println!("  Email:         {}", detail.email);
            println!("  Phone:         {}", detail.phone.as_deref().unwrap_or("-"));
            println!("  Type:          {}", detail.account.account_type);
            println!("  Balance:       {}", format_amount(detail.account.balance));
            println!("  Interest rate: {:.2}%", detail.account.interest_rate);
            println!("  Status:        {}", detail.account.status);
            println!(
                "  Opened:        {}",
                detail.account.created_at.format("%d-%b-%Y")
            );
        }

        AccountCommands::Verify { account } => {
            if !session.is_admin() {
                session.owned_account(&account)?;
            }
            let report = service.verify_account(&account).await?;

            println!("Account {}", report.account_number);
            println!("  Stored balance:   {}", format_amount(report.stored_balance));
            println!("  Replayed balance: {}", format_amount(report.replayed_balance));
            println!("  Transactions:     {}", report.transaction_count);
            if report.is_consistent() {
                println!("  OK: balance matches transaction history");
            } else {
                if !report.broken_links.is_empty() {
                    println!("  Broken balance snapshots at sequence: {:?}", report.broken_links);
                }
                anyhow::bail!("Account {} does not reconcile", report.account_number);
            }
        }
    }
    Ok(())
}

async fn run_statement_command(
    service: &BankService,
    account: &str,
    output: Option<&str>,
    format: StatementFormat,
    limit: u32,
) -> Result<()> {
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = StatementExporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = exporter.export(account, limit, format, writer).await?;
    if let Some(path) = output {
        eprintln!("Exported {} transactions to {}", count, path);
    }
    Ok(())
}

async fn run_admin_command(
    service: &BankService,
    session: &Session,
    cmd: AdminCommands,
) -> Result<()> {
    session.require_admin()?;

    match cmd {
        AdminCommands::Stats => {
            let stats = service.bank_stats().await?;
            println!("System-Wide Dashboard");
            println!("  Active accounts:    {}", stats.active_accounts);
            println!("  Total balance:      {}", format_amount(stats.total_balance));
            println!("  Total transactions: {}", stats.total_transactions);
        }

        AdminCommands::AccountStatus { account, status } => {
            let status = AccountStatus::from_str(&status)
                .with_context(|| format!("Invalid status '{}'. Valid: active, inactive", status))?;
            service.set_account_status(&account, status).await?;
            println!("Account {} is now {}", account.trim(), status);
        }

        AdminCommands::CustomerStatus { customer, status } => {
            let status = CustomerStatus::from_str(&status)
                .with_context(|| format!("Invalid status '{}'. Valid: active, inactive", status))?;
            let customer = service.set_customer_status(&customer, status).await?;
            println!("Customer {} is now {}", customer.email, customer.status);
        }
    }
    Ok(())
}

/// Parse a money amount entered by the user; it must be positive.
fn parse_amount(input: &str) -> Result<Cents> {
    let cents = parse_cents(input)
        .with_context(|| format!("Invalid amount '{}'. Use '5000' or '5000.00'", input))?;
    if cents <= 0 {
        anyhow::bail!("Amount must be positive");
    }
    Ok(cents)
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}'. Use YYYY-MM-DD", date_str))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_requires_positive() {
        assert_eq!(parse_amount("5000").unwrap(), 500_000);
        assert_eq!(parse_amount("0.01").unwrap(), 1);
        assert!(parse_amount("0").is_err());
        assert!(parse_amount("-10").is_err());
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Cash Deposit", 30), "Cash Deposit");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn test_cli_parses_transfer() {
        let cli = Cli::try_parse_from([
            "bankdesk",
            "--email",
            "a@b.com",
            "--password",
            "pw",
            "transfer",
            "1000",
            "--from",
            "ACC1000000001",
            "--to",
            "ACC1000000002",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Transfer { .. }));
        assert_eq!(cli.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_cli_rejects_mini_with_limit() {
        let result = Cli::try_parse_from([
            "bankdesk",
            "history",
            "ACC1000000001",
            "--mini",
            "--limit",
            "3",
        ]);
        assert!(result.is_err());
    }
}
