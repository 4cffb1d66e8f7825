use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CustomerId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerStatus {
    Active,
    Inactive,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Active => "Active",
            CustomerStatus::Inactive => "Inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(CustomerStatus::Active),
            "inactive" => Some(CustomerStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Privilege level. Only the admin bootstrap creates an `Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerRole {
    Customer,
    Admin,
}

impl CustomerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerRole::Customer => "Customer",
            CustomerRole::Admin => "Admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "customer" => Some(CustomerRole::Customer),
            "admin" => Some(CustomerRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for CustomerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// A customer profile. The credential hash is never part of this type;
/// it stays in the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub status: CustomerStatus,
    pub role: CustomerRole,
}

impl Customer {
    pub fn new(profile: NewCustomer) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: profile.full_name.trim().to_string(),
            email: normalize_email(&profile.email),
            phone: non_blank(profile.phone),
            address: non_blank(profile.address),
            date_of_birth: profile.date_of_birth,
            created_at: Utc::now(),
            status: CustomerStatus::Active,
            role: CustomerRole::Customer,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == CustomerRole::Admin
    }
}

/// Registration input, before an id has been generated.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: NaiveDate,
}

/// A partial update of a customer's contact details.
/// Blank strings count as "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactUpdate {
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl ContactUpdate {
    pub fn new(phone: Option<String>, address: Option<String>) -> Self {
        Self {
            phone: non_blank(phone),
            address: non_blank(address),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.address.is_none()
    }
}

/// Emails compare case-insensitively; they are stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
