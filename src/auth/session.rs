/// Session Lifecycle
///
/// Login, refresh and logout over the account store and token issuer.
///
/// Each account is in one of two implicit states:
/// - NoActiveRefresh: no stored fingerprint (initial, after logout)
/// - HasActiveRefresh: a fingerprint of the latest login's refresh token
///
/// A login always overwrites the fingerprint, so only the most recent
/// refresh token is ever accepted and concurrent logins resolve to the last
/// writer. Refresh does not rotate the refresh token.

use std::sync::Arc;
use uuid::Uuid;

use crate::accounts::{AccountRepository, AccountSummary};
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::verify_credentials;
use crate::auth::refresh_token::{fingerprint, fingerprint_matches};
use crate::error::{AppError, AuthError};

/// Result of a successful login
#[derive(Debug)]
pub struct LoginOutcome {
    pub access_token: String,
    /// Handed to the transport layer, never put in a response body
    pub refresh_token: String,
    pub account: AccountSummary,
}

/// Result of a successful refresh
#[derive(Debug)]
pub struct RefreshOutcome {
    pub access_token: String,
    pub account: AccountSummary,
}

#[derive(Clone)]
pub struct SessionService {
    accounts: Arc<dyn AccountRepository>,
    tokens: TokenIssuer,
}

impl SessionService {
    pub fn new(accounts: Arc<dyn AccountRepository>, tokens: TokenIssuer) -> Self {
        Self { accounts, tokens }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Verify credentials and start a new session, replacing any previous one.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let account = verify_credentials(self.accounts.as_ref(), email, password).await?;

        let access_token = self.tokens.issue_access(account.id, &account.roles)?;
        let refresh_token = self.tokens.issue_refresh(account.id)?;

        self.accounts
            .set_refresh_token_hash(account.id, Some(fingerprint(&refresh_token)))
            .await?;

        tracing::debug!(account_id = %account.id, "Refresh fingerprint stored");

        Ok(LoginOutcome {
            access_token,
            refresh_token,
            account: AccountSummary::from(&account),
        })
    }

    /// Exchange the current refresh token for a new access token.
    ///
    /// # Errors
    /// - `InvalidToken`: malformed, expired or wrongly signed token
    /// - `Unauthorized`: account missing or inactive, no live session, or the
    ///   token was superseded by a later login
    pub async fn refresh(&self, presented: &str) -> Result<RefreshOutcome, AppError> {
        let claims = self
            .tokens
            .verify_refresh(presented)
            .map_err(|_| AuthError::InvalidToken)?;
        let account_id = claims.account_id()?;

        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !account.is_active {
            return Err(AuthError::Unauthorized.into());
        }

        let stored = account
            .refresh_token_hash
            .as_deref()
            .ok_or(AuthError::Unauthorized)?;

        if !fingerprint_matches(presented, stored) {
            tracing::warn!(account_id = %account.id, "Superseded or revoked refresh token presented");
            return Err(AuthError::Unauthorized.into());
        }

        let access_token = self.tokens.issue_access(account.id, &account.roles)?;

        Ok(RefreshOutcome {
            access_token,
            account: AccountSummary::from(&account),
        })
    }

    /// Revoke the account's refresh token. Idempotent.
    pub async fn logout(&self, account_id: Uuid) -> Result<(), AppError> {
        self.accounts.set_refresh_token_hash(account_id, None).await
    }
}
