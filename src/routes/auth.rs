/// Authentication Routes
///
/// Login, token refresh, logout and current-user lookup. The refresh token
/// only ever travels in an HttpOnly cookie; response bodies carry the access
/// token alone.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::AccountSummary;
use crate::auth::{AuthenticatedUser, Role, SessionService};
use crate::configuration::{RefreshCookieSettings, SameSitePolicy};
use crate::error::{AppError, AuthError, ErrorContext};
use crate::validators::{is_present_password, is_valid_email};

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Access token response shared by login and refresh
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: AccountSummary,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub roles: Vec<Role>,
}

impl From<SameSitePolicy> for SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

fn refresh_cookie(settings: &RefreshCookieSettings, value: String, max_age: i64) -> Cookie<'static> {
    let mut builder = Cookie::build(settings.name.clone(), value)
        .path(settings.path.clone())
        .http_only(true)
        .secure(settings.secure)
        .same_site(settings.same_site.into())
        .max_age(Duration::seconds(max_age));

    if let Some(domain) = &settings.domain {
        builder = builder.domain(domain.clone());
    }

    builder.finish()
}

/// POST /api/auth/login
///
/// Verify email and password, start a new session and set the refresh
/// cookie. Any earlier refresh token for the account stops working.
///
/// # Errors
/// - 400: Malformed email or empty password
/// - 401: Unknown email, wrong password or inactive account (indistinguishable)
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
    cookie_settings: web::Data<RefreshCookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");

    let email = is_valid_email(&form.email)?;
    is_present_password(&form.password)?;

    let outcome = match sessions.login(&email, &form.password).await {
        Ok(outcome) => outcome,
        Err(e) => {
            context.log_error(&e);
            return Err(e);
        }
    };

    tracing::info!(
        request_id = %context.request_id,
        account_id = %outcome.account.id,
        "Login succeeded"
    );

    let tokens = sessions.tokens();
    let cookie = refresh_cookie(
        &cookie_settings,
        outcome.refresh_token,
        tokens.refresh_token_expiry(),
    );

    Ok(HttpResponse::Ok().cookie(cookie).json(TokenResponse {
        access_token: outcome.access_token,
        token_type: "Bearer",
        expires_in: tokens.access_token_expiry(),
        user: outcome.account,
    }))
}

/// POST /api/auth/refresh
///
/// Exchange the refresh cookie for a new access token. The refresh token is
/// not rotated; the cookie is left as it is.
///
/// # Errors
/// - 401: Missing cookie, invalid or expired token, revoked or superseded
///   session, or inactive account
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
    cookie_settings: web::Data<RefreshCookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    let cookie = req
        .cookie(&cookie_settings.name)
        .ok_or(AuthError::MissingToken)?;

    let outcome = match sessions.refresh(cookie.value()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            context.log_error(&e);
            return Err(e);
        }
    };

    tracing::info!(
        request_id = %context.request_id,
        account_id = %outcome.account.id,
        "Access token refreshed"
    );

    Ok(HttpResponse::Ok().json(TokenResponse {
        access_token: outcome.access_token,
        token_type: "Bearer",
        expires_in: sessions.tokens().access_token_expiry(),
        user: outcome.account,
    }))
}

/// POST /api/auth/logout
///
/// Revoke the caller's refresh token and clear the cookie. Access tokens
/// already issued stay valid until they expire.
pub async fn logout(
    user: AuthenticatedUser,
    sessions: web::Data<SessionService>,
    cookie_settings: web::Data<RefreshCookieSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("logout").with_user_id(user.account_id.to_string());

    sessions.logout(user.account_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = %user.account_id,
        "Logged out"
    );

    let mut removal = refresh_cookie(&cookie_settings, String::new(), 0);
    removal.make_removal();

    Ok(HttpResponse::Ok()
        .cookie(removal)
        .json(serde_json::json!({ "ok": true })))
}

/// GET /api/auth/me
///
/// Identity carried by the access token. No store lookup.
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(MeResponse {
        id: user.account_id,
        roles: user.claims.roles,
    })
}
