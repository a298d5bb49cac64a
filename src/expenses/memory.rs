use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use super::model::*;
use super::ExpenseRepository;
use crate::error::AppError;

#[derive(Default)]
struct State {
    next_id: i64,
    rows: BTreeMap<i64, Expense>,
}

/// Expense store kept in process memory. Backs the HTTP integration tests.
#[derive(Default)]
pub struct InMemoryExpenseRepository {
    state: RwLock<State>,
}

impl InMemoryExpenseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered(&self, filter: &ExpenseFilter, order: ExpenseOrder) -> Vec<Expense> {
        let state = self.state.read().await;
        let mut rows: Vec<Expense> = state
            .rows
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare(a, b, order));
        rows
    }
}

fn cents(expense: &Expense) -> i64 {
    parse_cents(&expense.amount).unwrap_or_default()
}

fn compare(a: &Expense, b: &Expense, order: ExpenseOrder) -> Ordering {
    let primary = match order.sort_by {
        SortBy::Date => a.date.cmp(&b.date),
        SortBy::Amount => cents(a).cmp(&cents(b)),
        SortBy::Category => a.category.cmp(&b.category),
        SortBy::Description => a.description.cmp(&b.description),
    };
    let ordering = primary.then(a.id.cmp(&b.id));
    match order.sort_dir {
        SortDir::Asc => ordering,
        SortDir::Desc => ordering.reverse(),
    }
}

fn totals<'a, K: Ord>(
    rows: impl Iterator<Item = &'a Expense>,
    key: impl Fn(&Expense) -> K,
) -> BTreeMap<K, (i64, i64)> {
    let mut groups = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(key(row)).or_insert((0i64, 0i64));
        entry.0 += cents(row);
        entry.1 += 1;
    }
    groups
}

#[async_trait]
impl ExpenseRepository for InMemoryExpenseRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Expense>, AppError> {
        Ok(self.state.read().await.rows.get(&id).cloned())
    }

    async fn create(&self, expense: NewExpense) -> Result<Expense, AppError> {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let created = Expense {
            id: state.next_id,
            description: expense.description,
            amount: expense.amount,
            category: expense.category,
            date: expense.date.unwrap_or_else(Utc::now),
        };
        state.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: ExpenseChanges) -> Result<Option<Expense>, AppError> {
        let mut state = self.state.write().await;
        let Some(row) = state.rows.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(description) = changes.description {
            row.description = description;
        }
        if let Some(amount) = changes.amount {
            row.amount = amount;
        }
        if let Some(category) = changes.category {
            row.category = category;
        }
        if let Some(date) = changes.date {
            row.date = date;
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.state.write().await.rows.remove(&id).is_some())
    }

    async fn find_page(
        &self,
        filter: &ExpenseFilter,
        order: ExpenseOrder,
        page: PageRequest,
    ) -> Result<ExpensePage, AppError> {
        let rows = self.filtered(filter, order).await;
        let sum: i64 = rows.iter().map(cents).sum();
        let total = rows.len() as i64;

        let data = rows
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size() as usize)
            .collect();

        Ok(ExpensePage {
            data,
            total,
            page: page.page(),
            page_size: page.page_size(),
            sum_amount: format_cents(sum),
        })
    }

    async fn find_for_export(
        &self,
        filter: &ExpenseFilter,
        order: ExpenseOrder,
        limit: usize,
    ) -> Result<Vec<Expense>, AppError> {
        let mut rows = self.filtered(filter, order).await;
        rows.truncate(limit);
        Ok(rows)
    }

    async fn categories(&self) -> Result<Vec<String>, AppError> {
        let state = self.state.read().await;
        let distinct: BTreeSet<String> = state.rows.values().map(|e| e.category.clone()).collect();
        Ok(distinct.into_iter().collect())
    }

    async fn report_by_category(&self, filter: &ExpenseFilter) -> Result<Vec<CategoryTotal>, AppError> {
        let state = self.state.read().await;
        let groups = totals(state.rows.values().filter(|e| filter.matches(e)), |e| e.category.clone());

        let mut report: Vec<(String, i64, i64)> = groups
            .into_iter()
            .map(|(category, (sum, count))| (category, sum, count))
            .collect();
        report.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(report
            .into_iter()
            .map(|(category, sum, count)| CategoryTotal {
                category,
                total: format_cents(sum),
                count,
            })
            .collect())
    }

    async fn report_by_date(
        &self,
        filter: &ExpenseFilter,
        grouping: DateGrouping,
    ) -> Result<Vec<PeriodTotal>, AppError> {
        let state = self.state.read().await;
        let groups = totals(state.rows.values().filter(|e| filter.matches(e)), |e| {
            grouping.label(&e.date)
        });

        Ok(groups
            .into_iter()
            .map(|(period, (sum, count))| PeriodTotal {
                period,
                total: format_cents(sum),
                count,
            })
            .collect())
    }
}
