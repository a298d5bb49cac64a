/// Expense Routes
///
/// CRUD, listing, search, export and reports. Every handler takes an
/// `ExpenseCaller`, which demands an access token only when
/// `application.require_auth_for_expenses` is set.

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::ExpenseCaller;
use crate::error::{AppError, ErrorContext, ValidationError};
use crate::expenses::{
    render_export, DateGrouping, ExpenseChanges, ExpenseFilter, ExpenseOrder, ExpenseRepository,
    ExportFormat, NewExpense, PageRequest, SortBy, SortDir, DEFAULT_PAGE_SIZE, MAX_EXPORT_ROWS,
    MAX_PAGE_SIZE,
};
use crate::validators::{
    optional_filter, parse_date_time, parse_upper_bound, validate_amount, validate_category,
    validate_description, validate_search_query,
};

const SEARCH_PAGE_SIZE: u32 = 50;

type Expenses = web::Data<dyn ExpenseRepository>;

/// Create expense request
#[derive(Deserialize)]
pub struct CreateExpenseRequest {
    pub description: String,
    pub amount: f64,
    pub category: Option<String>,
    pub date: Option<String>,
}

impl CreateExpenseRequest {
    pub fn validate(&self) -> Result<NewExpense, ValidationError> {
        Ok(NewExpense {
            description: validate_description(&self.description)?,
            amount: validate_amount(self.amount)?,
            category: validate_category(self.category.as_deref())?,
            date: self
                .date
                .as_deref()
                .map(|d| parse_date_time("date", d))
                .transpose()?,
        })
    }
}

/// Partial update request. Absent fields are left unchanged.
#[derive(Deserialize)]
pub struct UpdateExpenseRequest {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<String>,
}

impl UpdateExpenseRequest {
    pub fn validate(&self) -> Result<ExpenseChanges, ValidationError> {
        Ok(ExpenseChanges {
            description: self.description.as_deref().map(validate_description).transpose()?,
            amount: self.amount.map(validate_amount).transpose()?,
            category: self
                .category
                .as_deref()
                .map(|c| validate_category(Some(c)))
                .transpose()?,
            date: self
                .date
                .as_deref()
                .map(|d| parse_date_time("date", d))
                .transpose()?,
        })
    }
}

/// Query string shared by the read endpoints. Each endpoint reads the
/// parameters it understands.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseQuery {
    pub q: Option<String>,
    pub query: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "from")]
    pub date_from: Option<String>,
    #[serde(alias = "to")]
    pub date_to: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default)]
    pub sort_dir: SortDir,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub group_by: DateGrouping,
}

impl ExpenseQuery {
    pub fn filter(&self) -> Result<ExpenseFilter, ValidationError> {
        let date_from = self
            .date_from
            .as_deref()
            .map(|d| parse_date_time("dateFrom", d))
            .transpose()?;
        let date_to = self
            .date_to
            .as_deref()
            .map(|d| parse_upper_bound("dateTo", d))
            .transpose()?;

        if let (Some(from), Some(to)) = (date_from, date_to) {
            if from > to {
                return Err(ValidationError::OutOfRange(
                    "dateFrom must not be after dateTo".to_string(),
                ));
            }
        }

        Ok(ExpenseFilter {
            q: optional_filter(self.q.as_deref()),
            category: optional_filter(self.category.as_deref()),
            date_from,
            date_to,
        })
    }

    pub fn order(&self) -> ExpenseOrder {
        ExpenseOrder {
            sort_by: self.sort_by,
            sort_dir: self.sort_dir,
        }
    }

    pub fn page(&self) -> Result<PageRequest, ValidationError> {
        let page = self.page.unwrap_or(1);
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(ValidationError::OutOfRange("page must be >= 1".to_string()));
        }
        PageRequest::new(page, page_size).ok_or_else(|| {
            ValidationError::OutOfRange(format!("pageSize must be between 1 and {}", MAX_PAGE_SIZE))
        })
    }
}

fn context_for(operation: &str, caller: &ExpenseCaller) -> ErrorContext {
    let context = ErrorContext::new(operation);
    match caller.account_id() {
        Some(id) => context.with_user_id(id.to_string()),
        None => context,
    }
}

fn expense_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Expense {}", id))
}

/// GET /api/expenses
pub async fn list_expenses(
    _caller: ExpenseCaller,
    query: web::Query<ExpenseQuery>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let filter = query.filter()?;
    let page = query.page()?;

    let result = expenses.find_page(&filter, query.order(), page).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/expenses/search?query=
///
/// First 50 matches on description, newest first.
pub async fn search_expenses(
    _caller: ExpenseCaller,
    query: web::Query<ExpenseQuery>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let term = validate_search_query(query.query.as_deref())?;
    let filter = ExpenseFilter {
        q: Some(term),
        ..Default::default()
    };
    let page = PageRequest::new(1, SEARCH_PAGE_SIZE)
        .ok_or_else(|| AppError::Internal("Invalid search page size".to_string()))?;

    let result = expenses
        .find_page(&filter, ExpenseOrder::newest_first(), page)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/expenses/categories
pub async fn list_categories(
    _caller: ExpenseCaller,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let categories = expenses.categories().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": categories })))
}

/// GET /api/expenses/{id}
pub async fn get_expense(
    _caller: ExpenseCaller,
    path: web::Path<i64>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let expense = expenses
        .find_by_id(id)
        .await?
        .ok_or_else(|| expense_not_found(id))?;
    Ok(HttpResponse::Ok().json(expense))
}

/// POST /api/expenses
///
/// # Errors
/// - 400: Empty or too long description, non-positive amount, bad category or date
pub async fn create_expense(
    caller: ExpenseCaller,
    form: web::Json<CreateExpenseRequest>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let context = context_for("create_expense", &caller);

    let new_expense = form.validate()?;
    let created = match expenses.create(new_expense).await {
        Ok(created) => created,
        Err(e) => {
            context.log_error(&e);
            return Err(e);
        }
    };

    tracing::info!(
        request_id = %context.request_id,
        account_id = ?caller.account_id(),
        expense_id = created.id,
        "Expense created"
    );

    Ok(HttpResponse::Created().json(created))
}

/// PUT /api/expenses/{id}
pub async fn update_expense(
    caller: ExpenseCaller,
    path: web::Path<i64>,
    form: web::Json<UpdateExpenseRequest>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let context = context_for("update_expense", &caller);
    let id = path.into_inner();

    let changes = form.validate()?;
    let updated = expenses
        .update(id, changes)
        .await?
        .ok_or_else(|| expense_not_found(id))?;

    tracing::info!(
        request_id = %context.request_id,
        account_id = ?caller.account_id(),
        expense_id = id,
        "Expense updated"
    );

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/expenses/{id}
pub async fn delete_expense(
    caller: ExpenseCaller,
    path: web::Path<i64>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let context = context_for("delete_expense", &caller);
    let id = path.into_inner();

    if !expenses.delete(id).await? {
        return Err(expense_not_found(id));
    }

    tracing::info!(
        request_id = %context.request_id,
        account_id = ?caller.account_id(),
        expense_id = id,
        "Expense deleted"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": true })))
}

/// GET /api/expenses/export?format=csv|pdf
///
/// Accepts the list filters and ordering. At most 5000 rows are exported.
pub async fn export_expenses(
    caller: ExpenseCaller,
    query: web::Query<ExpenseQuery>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let context = context_for("export_expenses", &caller);
    let filter = query.filter()?;

    let rows = expenses
        .find_for_export(&filter, query.order(), MAX_EXPORT_ROWS)
        .await?;
    let file = match render_export(&rows, query.format, Utc::now().date_naive()) {
        Ok(file) => file,
        Err(e) => {
            context.log_error(&e);
            return Err(e);
        }
    };

    tracing::info!(
        request_id = %context.request_id,
        rows = rows.len(),
        format = file.content_type,
        "Expenses exported"
    );

    Ok(HttpResponse::Ok()
        .content_type(file.content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file.filename)],
        })
        .body(file.bytes))
}

/// GET /api/expenses/reports/by-category
pub async fn report_by_category(
    _caller: ExpenseCaller,
    query: web::Query<ExpenseQuery>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let filter = query.filter()?;
    let report = expenses.report_by_category(&filter).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": report })))
}

/// GET /api/expenses/reports/by-date?groupBy=day|month
pub async fn report_by_date(
    _caller: ExpenseCaller,
    query: web::Query<ExpenseQuery>,
    expenses: Expenses,
) -> Result<HttpResponse, AppError> {
    let filter = query.filter()?;
    let report = expenses.report_by_date(&filter, query.group_by).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": report })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let request = CreateExpenseRequest {
            description: " Lunch ".to_string(),
            amount: 12.5,
            category: None,
            date: None,
        };

        let expense = request.validate().unwrap();
        assert_eq!(expense.description, "Lunch");
        assert_eq!(expense.amount, "12.50");
        assert_eq!(expense.category, "other");
        assert!(expense.date.is_none());
    }

    #[test]
    fn test_create_request_rejects_bad_fields() {
        let bad = [
            ("", 1.0, None),
            ("Lunch", 0.0, None),
            ("Lunch", -3.0, None),
            ("Lunch", 1.0, Some("not-a-date")),
        ];

        for (description, amount, date) in bad {
            let request = CreateExpenseRequest {
                description: description.to_string(),
                amount,
                category: None,
                date: date.map(str::to_string),
            };
            assert!(
                request.validate().is_err(),
                "Should reject {:?} / {} / {:?}",
                description,
                amount,
                date
            );
        }
    }

    #[test]
    fn test_update_request_is_partial() {
        let request = UpdateExpenseRequest {
            description: None,
            amount: Some(7.0),
            category: None,
            date: None,
        };

        let changes = request.validate().unwrap();
        assert_eq!(changes.amount.as_deref(), Some("7.00"));
        assert!(changes.description.is_none());
        assert!(changes.category.is_none());
    }

    #[test]
    fn test_query_defaults() {
        let query = ExpenseQuery::default();

        let page = query.page().unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(query.order(), ExpenseOrder::newest_first());
        assert_eq!(query.format, ExportFormat::Csv);
        assert_eq!(query.group_by, DateGrouping::Day);
    }

    #[test]
    fn test_query_page_bounds() {
        let zero = ExpenseQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(zero.page().is_err());

        let too_big = ExpenseQuery {
            page_size: Some(MAX_PAGE_SIZE + 1),
            ..Default::default()
        };
        assert!(too_big.page().is_err());
    }

    #[test]
    fn test_query_filter_rejects_inverted_range() {
        let query = ExpenseQuery {
            date_from: Some("2026-02-01".to_string()),
            date_to: Some("2026-01-01".to_string()),
            ..Default::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn test_query_filter_blank_values_are_ignored() {
        let query = ExpenseQuery {
            q: Some("  ".to_string()),
            category: Some("".to_string()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert!(filter.q.is_none());
        assert!(filter.category.is_none());
    }
}
