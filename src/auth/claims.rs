/// JWT Claims structures
///
/// Access tokens carry the account id and its roles; refresh tokens carry
/// only the account id. Both carry a random `jti` so that two tokens minted
/// in the same second are never byte-identical.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::roles::{has_role, Role};
use crate::error::AuthError;

/// Claims of a short-lived access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Roles granted at issuance time
    pub roles: Vec<Role>,
    /// Token ID
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

/// Claims of a long-lived refresh token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

impl AccessClaims {
    pub fn new(account_id: Uuid, roles: Vec<Role>, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account_id.to_string(),
            roles,
            jti: Uuid::new_v4().to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract the account ID from the subject claim
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        parse_subject(&self.sub)
    }

    pub fn has_role(&self, role: Role) -> bool {
        has_role(&self.roles, role)
    }
}

impl RefreshClaims {
    pub fn new(account_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: account_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        parse_subject(&self.sub)
    }
}

fn parse_subject(sub: &str) -> Result<Uuid, AuthError> {
    Uuid::parse_str(sub).map_err(|_| AuthError::InvalidToken)
}
