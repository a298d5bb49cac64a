use expense_tracker::accounts::PgAccountRepository;
use expense_tracker::auth::{ExpenseAccess, TokenIssuer};
use expense_tracker::configuration::get_configuration;
use expense_tracker::expenses::PgExpenseRepository;
use expense_tracker::startup::{run, Repositories};
use expense_tracker::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let tokens = TokenIssuer::new(&configuration.jwt).map_err(|e| {
        tracing::error!("Invalid JWT configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
    })?;

    tracing::info!("Database ready");

    let repositories = Repositories {
        accounts: Arc::new(PgAccountRepository::new(pool.clone())),
        expenses: Arc::new(PgExpenseRepository::new(pool)),
    };

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let expense_access = ExpenseAccess {
        require_auth: configuration.application.require_auth_for_expenses,
    };
    if !expense_access.require_auth {
        tracing::warn!("Expense routes accept requests without an access token");
    }

    let server = run(
        listener,
        repositories,
        tokens,
        configuration.cookie,
        expense_access,
        configuration.application.static_dir,
    )?;
    tracing::info!("Server started successfully");

    server.await
}
