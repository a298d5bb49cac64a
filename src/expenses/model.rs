use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored expense. `amount` is the decimal rendered with two places.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: String,
    pub category: String,
    pub date: DateTime<Utc>,
}

/// A validated expense ready to insert. A missing date means "now".
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub amount: String,
    pub category: String,
    pub date: Option<DateTime<Utc>>,
}

/// Validated partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ExpenseChanges {
    pub description: Option<String>,
    pub amount: Option<String>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Row filter shared by listing, export and reports.
/// Both date bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ExpenseFilter {
    pub q: Option<String>,
    pub category: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        if let Some(q) = &self.q {
            if !expense.description.to_lowercase().contains(&q.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &expense.category != category {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if expense.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if expense.date > to {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Date,
    Amount,
    Category,
    Description,
}

impl SortBy {
    pub fn column(self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Amount => "amount",
            SortBy::Category => "category",
            SortBy::Description => "description",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortDir {
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[default]
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl SortDir {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpenseOrder {
    pub sort_by: SortBy,
    pub sort_dir: SortDir,
}

impl ExpenseOrder {
    pub fn newest_first() -> Self {
        Self::default()
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page request. Construct through `PageRequest::new` so the
/// bounds always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Option<Self> {
        if page == 0 || page_size == 0 || page_size > MAX_PAGE_SIZE {
            return None;
        }
        Some(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePage {
    pub data: Vec<Expense>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    /// Sum over every filtered row, not just this page
    pub sum_amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CategoryTotal {
    pub category: String,
    pub total: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct PeriodTotal {
    pub period: String,
    pub total: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateGrouping {
    #[default]
    Day,
    Month,
}

impl DateGrouping {
    /// `to_char` pattern
    pub fn sql_format(self) -> &'static str {
        match self {
            DateGrouping::Day => "YYYY-MM-DD",
            DateGrouping::Month => "YYYY-MM",
        }
    }

    /// `chrono` pattern producing the same label as `sql_format`
    pub fn label_format(self) -> &'static str {
        match self {
            DateGrouping::Day => "%Y-%m-%d",
            DateGrouping::Month => "%Y-%m",
        }
    }

    pub fn label(self, date: &DateTime<Utc>) -> String {
        date.format(self.label_format()).to_string()
    }
}

/// Render integer cents as a two-place decimal string.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal string with at most two places into cents.
pub fn parse_cents(amount: &str) -> Option<i64> {
    let amount = amount.trim();
    let (negative, digits) = match amount.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, amount),
    };

    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    if whole.is_empty() || fraction.len() > 2 {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    let cents = whole.checked_mul(100)?.checked_add(fraction)?;
    Some(if negative { -cents } else { cents })
}
