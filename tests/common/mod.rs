//! Shared harness: the real server on a random port over in-memory stores.

#![allow(dead_code)]

use expense_tracker::accounts::{Account, InMemoryAccountRepository};
use expense_tracker::auth::{ExpenseAccess, Role, TokenIssuer};
use expense_tracker::configuration::{JwtSettings, RefreshCookieSettings};
use expense_tracker::expenses::InMemoryExpenseRepository;
use expense_tracker::startup::{run, Repositories};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use uuid::Uuid;

pub const PASSWORD: &str = "SecurePass123";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const USER_EMAIL: &str = "user@example.com";
pub const COOKIE_NAME: &str = "refresh_token";

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub accounts: Arc<InMemoryAccountRepository>,
    pub expenses: Arc<InMemoryExpenseRepository>,
    pub admin_id: Uuid,
    pub user_id: Uuid,
}

pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub body: Value,
}

pub fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_secret: "integration-access-secret-0123456789".to_string(),
        refresh_secret: "integration-refresh-secret-0123456789".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 1_209_600,
        issuer: "expense-tracker".to_string(),
    }
}

async fn provision(accounts: &InMemoryAccountRepository, email: &str, role: Role) -> Uuid {
    // Low cost keeps the suite fast
    let hash = bcrypt::hash(PASSWORD, 4).expect("Failed to hash password");
    let account = Account::new(email, hash, vec![role]);
    let id = account.id;
    accounts.insert(account).await;
    id
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(ExpenseAccess::default()).await
}

/// Same server, with expense routes demanding an access token.
pub async fn spawn_guarded_app() -> TestApp {
    spawn_app_with(ExpenseAccess { require_auth: true }).await
}

pub async fn spawn_app_with(expense_access: ExpenseAccess) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let accounts = Arc::new(InMemoryAccountRepository::new());
    let expenses = Arc::new(InMemoryExpenseRepository::new());
    let admin_id = provision(&accounts, ADMIN_EMAIL, Role::Admin).await;
    let user_id = provision(&accounts, USER_EMAIL, Role::User).await;

    let tokens = TokenIssuer::new(&jwt_settings()).expect("Failed to build token issuer");
    let repositories = Repositories {
        accounts: accounts.clone(),
        expenses: expenses.clone(),
    };

    let server = run(
        listener,
        repositories,
        tokens,
        RefreshCookieSettings::default(),
        expense_access,
        None,
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        client: reqwest::Client::new(),
        accounts,
        expenses,
        admin_id,
        user_id,
    }
}

/// Value of the refresh cookie set by a response, if any.
pub fn refresh_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find(|h| h.starts_with(&format!("{}=", COOKIE_NAME)))
        .map(str::to_string)
}

/// Extract `value` from `name=value; Attr; ...`
pub fn cookie_value(set_cookie: &str) -> String {
    let pair = set_cookie.split(';').next().unwrap_or_default();
    pair.splitn(2, '=').nth(1).unwrap_or_default().to_string()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, email: &str) -> Session {
        let response = self.post_login(email, PASSWORD).await;
        assert_eq!(200, response.status().as_u16(), "Login failed for {}", email);

        let cookie = refresh_cookie(&response).expect("Login did not set the refresh cookie");
        let body: Value = response.json().await.expect("Failed to parse response");

        Session {
            access_token: body["accessToken"].as_str().unwrap().to_string(),
            refresh_token: cookie_value(&cookie),
            body,
        }
    }

    pub async fn post_refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/refresh"))
            .header("Cookie", format!("{}={}", COOKIE_NAME, refresh_token))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_logout(&self, access_token: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/auth/logout"))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_authed(&self, path: &str, access_token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn create_expense(&self, access_token: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/expenses"))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}
