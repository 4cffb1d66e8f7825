// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use bankdesk::{AccountType, BankService, Cents, Config, Customer, NewCustomer};
use chrono::NaiveDate;
use tempfile::TempDir;

pub const PASSWORD: &str = "password123";
pub const ADMIN_PASSWORD: &str = "admin-secret";

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    // Lowest bcrypt cost keeps the suite fast.
    let config = Config::new(database_path(&temp_dir)).with_password_cost(4);
    let service = BankService::init(config).await?;
    Ok((service, temp_dir))
}

/// Path of the database file created by `test_service`.
pub fn database_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

pub fn profile(name: &str, email: &str) -> NewCustomer {
    NewCustomer {
        full_name: name.into(),
        email: email.into(),
        phone: Some("9876543210".into()),
        address: Some("12 MG Road, Bengaluru".into()),
        date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 15).unwrap(),
    }
}

/// Test fixture: customers and accounts used across suites
pub struct StandardCustomers;

impl StandardCustomers {
    pub async fn rahul(service: &BankService) -> Result<Customer> {
        Ok(service
            .register_customer(profile("Rahul Sharma", "rahul.sharma@email.com"), PASSWORD)
            .await?)
    }

    pub async fn priya(service: &BankService) -> Result<Customer> {
        Ok(service
            .register_customer(profile("Priya Patel", "priya.patel@email.com"), PASSWORD)
            .await?)
    }

    /// The administrator login for the default admin email.
    pub async fn admin(service: &BankService) -> Result<Customer> {
        Ok(service.create_admin(ADMIN_PASSWORD).await?)
    }

    /// Open an account holding `opening` cents.
    pub async fn open_funded(
        service: &BankService,
        customer: &Customer,
        account_type: AccountType,
        opening: Cents,
    ) -> Result<String> {
        Ok(service
            .create_account(customer.id, account_type, opening)
            .await?)
    }
}

pub async fn balance_of(service: &BankService, account_number: &str) -> Result<Cents> {
    let account = service
        .get_account(account_number)
        .await?
        .ok_or_else(|| anyhow::anyhow!("missing account {}", account_number))?;
    Ok(account.balance)
}
