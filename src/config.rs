/// Default database file, relative to the working directory.
pub const DEFAULT_DATABASE: &str = "bankdesk.db";

/// Email reserved for the administrator login created by `init`.
pub const DEFAULT_ADMIN_EMAIL: &str = "sys_admin@bank.com";

/// Default number of rows shown by `history`.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Runtime settings shared by the service and the CLI.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path
    pub database: String,
    /// bcrypt work factor for new credentials
    pub password_cost: u32,
    /// Reserved for the administrator; customers cannot register it
    pub admin_email: String,
    pub history_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            password_cost: bcrypt::DEFAULT_COST,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Config {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = email.into();
        self
    }

    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        email.trim().eq_ignore_ascii_case(self.admin_email.trim())
    }
}
