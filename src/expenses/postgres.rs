use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::model::*;
use super::ExpenseRepository;
use crate::error::AppError;

const EXPENSE_COLUMNS: &str = "id, description, amount::text AS amount, category, date";

/// Expense store backed by the `expenses` table
#[derive(Clone)]
pub struct PgExpenseRepository {
    pool: PgPool,
}

impl PgExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ExpenseFilter) {
    builder.push(" WHERE TRUE");

    if let Some(q) = &filter.q {
        builder
            .push(" AND description ILIKE ")
            .push_bind(format!("%{}%", escape_like(q)));
    }
    if let Some(category) = &filter.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND date <= ").push_bind(to);
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, order: ExpenseOrder) {
    // Column and direction come from closed enums, never from input text
    builder
        .push(" ORDER BY ")
        .push(order.sort_by.column())
        .push(" ")
        .push(order.sort_dir.keyword())
        .push(", id ")
        .push(order.sort_dir.keyword());
}

#[async_trait]
impl ExpenseRepository for PgExpenseRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Expense>, AppError> {
        let query = format!("SELECT {} FROM expenses WHERE id = $1", EXPENSE_COLUMNS);
        let expense = sqlx::query_as::<_, Expense>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    async fn create(&self, expense: NewExpense) -> Result<Expense, AppError> {
        let query = format!(
            r#"
            INSERT INTO expenses (description, amount, category, date)
            VALUES ($1, $2::numeric, $3, COALESCE($4, now()))
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        );
        let created = sqlx::query_as::<_, Expense>(&query)
            .bind(&expense.description)
            .bind(&expense.amount)
            .bind(&expense.category)
            .bind(expense.date)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update(&self, id: i64, changes: ExpenseChanges) -> Result<Option<Expense>, AppError> {
        let query = format!(
            r#"
            UPDATE expenses SET
                description = COALESCE($2, description),
                amount = COALESCE($3::numeric, amount),
                category = COALESCE($4, category),
                date = COALESCE($5, date)
            WHERE id = $1
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        );
        let updated = sqlx::query_as::<_, Expense>(&query)
            .bind(id)
            .bind(changes.description)
            .bind(changes.amount)
            .bind(changes.category)
            .bind(changes.date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_page(
        &self,
        filter: &ExpenseFilter,
        order: ExpenseOrder,
        page: PageRequest,
    ) -> Result<ExpensePage, AppError> {
        let mut totals = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS total, COALESCE(SUM(amount), 0)::numeric(14, 2)::text AS sum_amount FROM expenses",
        );
        push_filter(&mut totals, filter);
        let (total, sum_amount): (i64, String) =
            totals.build_query_as().fetch_one(&self.pool).await?;

        let mut rows = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM expenses", EXPENSE_COLUMNS));
        push_filter(&mut rows, filter);
        push_order(&mut rows, order);
        rows.push(" LIMIT ")
            .push_bind(page.page_size() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = rows.build_query_as::<Expense>().fetch_all(&self.pool).await?;

        Ok(ExpensePage {
            data,
            total,
            page: page.page(),
            page_size: page.page_size(),
            sum_amount,
        })
    }

    async fn find_for_export(
        &self,
        filter: &ExpenseFilter,
        order: ExpenseOrder,
        limit: usize,
    ) -> Result<Vec<Expense>, AppError> {
        let mut rows = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM expenses", EXPENSE_COLUMNS));
        push_filter(&mut rows, filter);
        push_order(&mut rows, order);
        rows.push(" LIMIT ").push_bind(limit as i64);

        let data = rows.build_query_as::<Expense>().fetch_all(&self.pool).await?;
        Ok(data)
    }

    async fn categories(&self) -> Result<Vec<String>, AppError> {
        let categories =
            sqlx::query_scalar::<_, String>("SELECT DISTINCT category FROM expenses ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn report_by_category(&self, filter: &ExpenseFilter) -> Result<Vec<CategoryTotal>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT category, SUM(amount)::numeric(14, 2)::text AS total, COUNT(*) AS count FROM expenses",
        );
        push_filter(&mut builder, filter);
        builder.push(" GROUP BY category ORDER BY SUM(amount) DESC, category ASC");

        let report = builder
            .build_query_as::<CategoryTotal>()
            .fetch_all(&self.pool)
            .await?;
        Ok(report)
    }

    async fn report_by_date(
        &self,
        filter: &ExpenseFilter,
        grouping: DateGrouping,
    ) -> Result<Vec<PeriodTotal>, AppError> {
        // The pattern is a fixed literal selected by the enum
        let mut builder = QueryBuilder::<Postgres>::new("SELECT to_char(expenses.date AT TIME ZONE 'UTC', '");
        builder
            .push(grouping.sql_format())
            .push("') AS period, SUM(amount)::numeric(14, 2)::text AS total, COUNT(*) AS count FROM expenses");
        push_filter(&mut builder, filter);
        builder.push(" GROUP BY period ORDER BY period ASC");

        let report = builder
            .build_query_as::<PeriodTotal>()
            .fetch_all(&self.pool)
            .await?;
        Ok(report)
    }
}
