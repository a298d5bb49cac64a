use actix_files as fs;
use actix_web::dev::Server;
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{middleware::Logger, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::accounts::AccountRepository;
use crate::auth::{ExpenseAccess, SessionService, TokenIssuer};
use crate::configuration::RefreshCookieSettings;
use crate::error::{AppError, ValidationError};
use crate::expenses::ExpenseRepository;
use crate::logger::LoggerMiddleware;
use crate::routes::{
    create_expense, delete_expense, export_expenses, get_expense, health_check, list_categories,
    list_expenses, login, logout, me, ping, refresh, report_by_category, report_by_date,
    search_expenses, update_expense,
};

/// Persistence backing the server
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub expenses: Arc<dyn ExpenseRepository>,
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationError::InvalidFormat(format!("request body ({})", err))).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationError::InvalidFormat(format!("query string ({})", err))).into()
}

pub fn run(
    listener: TcpListener,
    repositories: Repositories,
    tokens: TokenIssuer,
    cookie: RefreshCookieSettings,
    expense_access: ExpenseAccess,
    static_dir: Option<String>,
) -> Result<Server, std::io::Error> {
    let sessions = web::Data::new(SessionService::new(repositories.accounts, tokens.clone()));
    let tokens = web::Data::new(tokens);
    let cookie = web::Data::new(cookie);
    let expense_access = web::Data::new(expense_access);
    let expenses: web::Data<dyn ExpenseRepository> = web::Data::from(repositories.expenses);

    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Extractor configuration
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))

            // Shared state
            .app_data(sessions.clone())
            .app_data(tokens.clone())
            .app_data(cookie.clone())
            .app_data(expenses.clone())
            .app_data(expense_access.clone())

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    // Session
                    .route("/auth/login", web::post().to(login))
                    .route("/auth/refresh", web::post().to(refresh))
                    .route("/auth/logout", web::post().to(logout))
                    .route("/auth/me", web::get().to(me))

                    // Admin only
                    .route("/admin/ping", web::get().to(ping))

                    // Expenses, guarded per ExpenseAccess; fixed paths before /{id}
                    .route("/expenses", web::get().to(list_expenses))
                    .route("/expenses", web::post().to(create_expense))
                    .route("/expenses/search", web::get().to(search_expenses))
                    .route("/expenses/categories", web::get().to(list_categories))
                    .route("/expenses/export", web::get().to(export_expenses))
                    .route("/expenses/reports/by-category", web::get().to(report_by_category))
                    .route("/expenses/reports/by-date", web::get().to(report_by_date))
                    .route("/expenses/{id}", web::get().to(get_expense))
                    .route("/expenses/{id}", web::put().to(update_expense))
                    .route("/expenses/{id}", web::delete().to(delete_expense)),
            )

            // Static file serving (must be last to not override API routes)
            .configure(|cfg| {
                if let Some(dir) = &static_dir {
                    cfg.service(fs::Files::new("/", dir).index_file("index.html"));
                }
            })
    })
    .listen(listener)?
    .run();

    Ok(server)
}
