use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{Account, AccountRepository};
use crate::auth::Role;
use crate::error::AppError;

const SELECT_ACCOUNT: &str = r#"
    SELECT u.id, u.email, u.password_hash, u.is_active, u.refresh_token_hash,
           COALESCE(array_agg(r.name::text) FILTER (WHERE r.name IS NOT NULL), '{}'::text[]) AS roles
    FROM users u
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    is_active: bool,
    refresh_token_hash: Option<String>,
    roles: Vec<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        let roles = row
            .roles
            .iter()
            .filter_map(|name| match name.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!(account_id = %row.id, error = %e, "Ignoring unknown role");
                    None
                }
            })
            .collect();

        Account {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            refresh_token_hash: row.refresh_token_hash,
            roles,
        }
    }
}

/// Account store backed by the `users`, `roles` and `user_roles` tables
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or re-activate an account with the given roles.
    ///
    /// Used by provisioning only; the session layer never creates accounts.
    pub async fn provision(
        &self,
        email: &str,
        password_hash: &str,
        roles: &[Role],
    ) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;

        for role in Role::ALL {
            sqlx::query("INSERT INTO roles (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
                .bind(Uuid::new_v4())
                .bind(role.as_str())
                .execute(&mut tx)
                .await?;
        }

        let account_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (id, email, password_hash, is_active)
            VALUES ($1, $2, $3, true)
            ON CONFLICT (email) DO UPDATE
            SET password_hash = EXCLUDED.password_hash, is_active = true, updated_at = now()
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&mut tx)
        .await?;

        for role in roles {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                SELECT $1, id FROM roles WHERE name = $2
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(account_id)
            .bind(role.as_str())
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(account_id)
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let query = format!("{} WHERE u.email = $1 GROUP BY u.id", SELECT_ACCOUNT);
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let query = format!("{} WHERE u.id = $1 GROUP BY u.id", SELECT_ACCOUNT);
        let row = sqlx::query_as::<_, AccountRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    async fn set_refresh_token_hash(&self, id: Uuid, hash: Option<String>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token_hash = $1, updated_at = now() WHERE id = $2")
            .bind(hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
