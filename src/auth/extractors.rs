/// Request authentication
///
/// `AuthenticatedUser` is an actix extractor: a handler that needs a caller
/// identity takes it as a parameter and receives the verified access claims
/// directly. Role gating is an explicit call on the extracted value.
///
/// `ExpenseCaller` fronts the expense routes, which only authenticate when
/// `ExpenseAccess::require_auth` is set.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::auth::claims::AccessClaims;
use crate::auth::jwt::TokenIssuer;
use crate::auth::roles::Role;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub account_id: Uuid,
    pub claims: AccessClaims,
}

impl AuthenticatedUser {
    /// Fail with `Forbidden` unless the caller holds `role`.
    pub fn require_role(&self, role: Role) -> Result<(), AuthError> {
        if self.claims.has_role(role) {
            Ok(())
        } else {
            tracing::warn!(account_id = %self.account_id, required = %role, "Role check failed");
            Err(AuthError::Forbidden)
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// Access rule for the expense routes
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseAccess {
    pub require_auth: bool,
}

/// Caller of an expense route. Holds an identity only when the rule requires one.
#[derive(Debug, Clone)]
pub struct ExpenseCaller(pub Option<AuthenticatedUser>);

impl ExpenseCaller {
    pub fn account_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.account_id)
    }
}

impl FromRequest for ExpenseCaller {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve_caller(req))
    }
}

fn resolve_caller(req: &HttpRequest) -> Result<ExpenseCaller, AppError> {
    let require_auth = req
        .app_data::<web::Data<ExpenseAccess>>()
        .map(|access| access.require_auth)
        .unwrap_or(false);

    if require_auth {
        authenticate(req).map(|user| ExpenseCaller(Some(user)))
    } else {
        Ok(ExpenseCaller(None))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let tokens = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| AppError::Internal("Token issuer is not registered".to_string()))?;

    let token = bearer_token(req).ok_or(AuthError::MissingToken)?;

    let claims = tokens
        .verify_access(token)
        .map_err(|_| AuthError::InvalidToken)?;
    let account_id = claims.account_id()?;

    tracing::debug!(account_id = %account_id, "Access token verified");

    Ok(AuthenticatedUser { account_id, claims })
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::JwtSettings;
    use actix_web::test::TestRequest;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&JwtSettings {
            access_secret: "access-secret-key-at-least-32-characters".to_string(),
            refresh_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 1_209_600,
            issuer: "test".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_valid_bearer_token() {
        let tokens = issuer();
        let account_id = Uuid::new_v4();
        let token = tokens.issue_access(account_id, &[Role::Admin]).unwrap();

        let req = TestRequest::default()
            .app_data(web::Data::new(tokens))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();

        let user = authenticate(&req).unwrap();
        assert_eq!(user.account_id, account_id);
        assert!(user.require_role(Role::Admin).is_ok());
        assert_eq!(user.require_role(Role::Manager), Err(AuthError::Forbidden));
    }

    #[test]
    fn test_missing_header() {
        let req = TestRequest::default()
            .app_data(web::Data::new(issuer()))
            .to_http_request();

        assert!(matches!(
            authenticate(&req),
            Err(AppError::Auth(AuthError::MissingToken))
        ));
    }

    #[test]
    fn test_malformed_headers() {
        for header in ["Bearer", "Bearer ", "Basic dXNlcjpwYXNz", "BearerToken"] {
            let req = TestRequest::default()
                .app_data(web::Data::new(issuer()))
                .insert_header(("Authorization", header))
                .to_http_request();

            assert!(
                matches!(authenticate(&req), Err(AppError::Auth(AuthError::MissingToken))),
                "Should reject header: {}",
                header
            );
        }
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let tokens = issuer();
        let refresh = tokens.issue_refresh(Uuid::new_v4()).unwrap();

        let req = TestRequest::default()
            .app_data(web::Data::new(tokens))
            .insert_header(("Authorization", format!("Bearer {}", refresh)))
            .to_http_request();

        assert!(matches!(
            authenticate(&req),
            Err(AppError::Auth(AuthError::InvalidToken))
        ));
    }

    #[test]
    fn test_open_expense_access_skips_token_check() {
        let req = TestRequest::default()
            .app_data(web::Data::new(issuer()))
            .app_data(web::Data::new(ExpenseAccess { require_auth: false }))
            .insert_header(("Authorization", "Bearer invalid.token.here"))
            .to_http_request();

        let caller = resolve_caller(&req).unwrap();
        assert!(caller.account_id().is_none());
    }

    #[test]
    fn test_required_expense_access_authenticates() {
        let tokens = issuer();
        let account_id = Uuid::new_v4();
        let token = tokens.issue_access(account_id, &[Role::User]).unwrap();

        let req = TestRequest::default()
            .app_data(web::Data::new(tokens))
            .app_data(web::Data::new(ExpenseAccess { require_auth: true }))
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();
        assert_eq!(resolve_caller(&req).unwrap().account_id(), Some(account_id));

        let req = TestRequest::default()
            .app_data(web::Data::new(issuer()))
            .app_data(web::Data::new(ExpenseAccess { require_auth: true }))
            .to_http_request();
        assert!(matches!(
            resolve_caller(&req),
            Err(AppError::Auth(AuthError::MissingToken))
        ));
    }
}
