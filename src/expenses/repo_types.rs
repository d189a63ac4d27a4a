use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum Category {
    Food,
    Transportation,
    Entertainment,
    Utilities,
    Healthcare,
    Shopping,
    Education,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transportation,
        Category::Entertainment,
        Category::Utilities,
        Category::Healthcare,
        Category::Shopping,
        Category::Education,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Entertainment => "Entertainment",
            Category::Utilities => "Utilities",
            Category::Healthcare => "Healthcare",
            Category::Shopping => "Shopping",
            Category::Education => "Education",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                format!("Category must be one of: {}", names.join(", "))
            })
    }
}

/// Expense row, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub amount: f64,
    pub category: Category,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated fields for an insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    pub category: Category,
    pub date: Date,
    pub description: String,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseChanges {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<Category>,
    pub date: Option<Date>,
    /// `Some("")` clears the description.
    pub description: Option<String>,
}

impl ExpenseChanges {
    pub fn apply(self, mut expense: Expense) -> Expense {
        if let Some(title) = self.title {
            expense.title = title;
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(date) = self.date {
            expense.date = date;
        }
        if let Some(description) = self.description {
            expense.description = description;
        }
        expense
    }
}

/// Predicates ANDed together; `None` disables a predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Raw category name; an unknown name matches nothing.
    pub category: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
}

impl ExpenseFilter {
    pub fn dates_only(&self) -> ExpenseFilter {
        ExpenseFilter {
            start_date: self.start_date,
            end_date: self.end_date,
            ..Default::default()
        }
    }

    pub fn matches(&self, e: &Expense) -> bool {
        if let Some(cat) = &self.category {
            if e.category.as_str() != cat {
                return false;
            }
        }
        if self.start_date.is_some_and(|d| e.date < d) {
            return false;
        }
        if self.end_date.is_some_and(|d| e.date > d) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            if !e.title.to_lowercase().contains(&term)
                && !e.description.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 10;

    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.unwrap_or(1).clamp(1, i64::from(u32::MAX)) as u32;
        let limit = limit
            .unwrap_or(i64::from(Self::DEFAULT_LIMIT))
            .clamp(1, i64::from(u32::MAX)) as u32;
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Per-category aggregate as returned by the store.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: f64,
    pub count: i64,
}
