/// Accounts
///
/// The account record and the repository the session layer reads and writes
/// through. The repository is a thin accessor with no policy of its own.

mod memory;
mod postgres;

pub use memory::InMemoryAccountRepository;
pub use postgres::PgAccountRepository;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::Role;
use crate::error::AppError;

/// A login identity
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    /// Unique, compared case-sensitively
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    /// Fingerprint of the single live refresh token, if any
    pub refresh_token_hash: Option<String>,
    pub roles: Vec<Role>,
}

impl Account {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            is_active: true,
            refresh_token_hash: None,
            roles,
        }
    }
}

/// The public view of an account returned alongside tokens
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountSummary {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<Role>,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            roles: account.roles.clone(),
        }
    }
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    /// Overwrite the stored refresh fingerprint. `None` revokes.
    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<String>) -> Result<(), AppError>;
}
