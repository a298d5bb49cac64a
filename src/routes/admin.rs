use actix_web::HttpResponse;
use chrono::Utc;

use crate::auth::{AuthenticatedUser, Role};
use crate::error::AppError;

/// GET /api/admin/ping
///
/// Liveness probe for operators. Requires the `admin` role.
pub async fn ping(user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    user.require_role(Role::Admin)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "message": "pong (admin)",
        "timestamp": Utc::now().to_rfc3339(),
    })))
}
