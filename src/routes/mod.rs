mod admin;
mod auth;
mod expenses;
mod health_check;

pub use admin::ping;
pub use auth::{login, logout, me, refresh, LoginRequest, MeResponse, TokenResponse};
pub use expenses::{
    create_expense, delete_expense, export_expenses, get_expense, list_categories, list_expenses,
    report_by_category, report_by_date, search_expenses, update_expense, CreateExpenseRequest,
    ExpenseQuery, UpdateExpenseRequest,
};
pub use health_check::health_check;
