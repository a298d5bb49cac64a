//! Provision the role catalogue and an administrator account.
//!
//! Reads `seed.admin_email` / `seed.admin_password` from the usual
//! configuration sources (e.g. `APP_SEED__ADMIN_PASSWORD`). Re-running resets
//! the admin password and re-activates the account.

use expense_tracker::accounts::PgAccountRepository;
use expense_tracker::auth::{hash_password, Role};
use expense_tracker::configuration::get_configuration;
use expense_tracker::telemetry::init_telemetry;
use expense_tracker::validators::is_valid_email;
use sqlx::postgres::PgPoolOptions;

fn fail(message: &str, error: impl std::fmt::Display) -> std::io::Error {
    tracing::error!("{}: {}", message, error);
    std::io::Error::new(std::io::ErrorKind::Other, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    let configuration = get_configuration().map_err(|e| fail("Failed to read configuration", e))?;
    let seed = configuration.seed.ok_or_else(|| {
        fail(
            "Missing seed settings",
            "set seed.admin_email and seed.admin_password",
        )
    })?;

    let email = is_valid_email(&seed.admin_email).map_err(|e| fail("Invalid admin email", e))?;
    let password_hash =
        hash_password(&seed.admin_password).map_err(|e| fail("Invalid admin password", e))?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| fail("Failed to connect to database", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| fail("Failed to run migrations", e))?;

    let accounts = PgAccountRepository::new(pool);
    let account_id = accounts
        .provision(&email, &password_hash, &[Role::Admin])
        .await
        .map_err(|e| fail("Failed to provision admin", e))?;

    tracing::info!(account_id = %account_id, email = %email, "Admin account provisioned");

    Ok(())
}
