use crate::application::{BankError, BankService};
use crate::domain::{Account, Customer};

/// The logged-in customer and their account list.
///
/// Built once per invocation by [`Session::login`] and handed to every
/// command handler that acts on behalf of a customer.
#[derive(Debug, Clone)]
pub struct Session {
    customer: Customer,
    accounts: Vec<Account>,
    is_admin: bool,
}

impl Session {
    /// Authenticate and load the customer's accounts.
    pub async fn login(
        service: &BankService,
        email: &str,
        password: &str,
    ) -> Result<Self, BankError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(BankError::validation("email and password are required"));
        }

        let customer = service
            .authenticate(email, password)
            .await?
            .ok_or(BankError::AuthenticationFailure)?;
        let accounts = service.list_accounts(customer.id).await?;
        let is_admin = customer.is_admin();

        Ok(Self {
            customer,
            accounts,
            is_admin,
        })
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    /// Accounts as of login or the last [`Session::refresh`], newest first.
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Resolve an account number that must belong to this customer.
    pub fn owned_account(&self, account_number: &str) -> Result<&Account, BankError> {
        let account_number = account_number.trim();
        if account_number.is_empty() {
            return Err(BankError::validation("account number is required"));
        }
        self.accounts
            .iter()
            .find(|a| a.account_number == account_number)
            .ok_or_else(|| BankError::AccessDenied(account_number.to_string()))
    }

    pub fn require_admin(&self) -> Result<(), BankError> {
        if !self.is_admin {
            return Err(BankError::AdminRequired);
        }
        Ok(())
    }

    /// Reload the account list after a balance-changing command.
    pub async fn refresh(&mut self, service: &BankService) -> Result<(), BankError> {
        self.accounts = service.list_accounts(self.customer.id).await?;
        Ok(())
    }

    /// Replace the cached profile after a contact update.
    pub fn set_customer(&mut self, customer: Customer) {
        self.customer = customer;
    }
}
