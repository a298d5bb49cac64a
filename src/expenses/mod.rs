/// Expenses module
///
/// The expense record, its query vocabulary (filters, ordering, paging,
/// grouping), the repository seam with PostgreSQL and in-memory stores,
/// and CSV/PDF export.

mod export;
mod memory;
mod model;
mod postgres;

pub use export::{render_export, to_csv, to_pdf, ExportFile, ExportFormat, MAX_EXPORT_ROWS, MAX_PDF_ROWS};
pub use memory::InMemoryExpenseRepository;
pub use model::{
    format_cents, parse_cents, CategoryTotal, DateGrouping, Expense, ExpenseChanges, ExpenseFilter,
    ExpenseOrder, ExpensePage, NewExpense, PageRequest, PeriodTotal, SortBy, SortDir,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use postgres::PgExpenseRepository;

use async_trait::async_trait;

use crate::error::AppError;

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Expense>, AppError>;

    async fn create(&self, expense: NewExpense) -> Result<Expense, AppError>;

    /// Returns `None` when no expense has this id.
    async fn update(&self, id: i64, changes: ExpenseChanges) -> Result<Option<Expense>, AppError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    async fn find_page(
        &self,
        filter: &ExpenseFilter,
        order: ExpenseOrder,
        page: PageRequest,
    ) -> Result<ExpensePage, AppError>;

    async fn find_for_export(
        &self,
        filter: &ExpenseFilter,
        order: ExpenseOrder,
        limit: usize,
    ) -> Result<Vec<Expense>, AppError>;

    /// Distinct categories, sorted
    async fn categories(&self) -> Result<Vec<String>, AppError>;

    /// Ordered by total descending, then category
    async fn report_by_category(&self, filter: &ExpenseFilter) -> Result<Vec<CategoryTotal>, AppError>;

    /// Ordered by period ascending
    async fn report_by_date(
        &self,
        filter: &ExpenseFilter,
        grouping: DateGrouping,
    ) -> Result<Vec<PeriodTotal>, AppError>;
}
