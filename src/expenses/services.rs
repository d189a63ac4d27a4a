use time::Date;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{CategorySummary, CreateExpenseRequest, ExpenseSummary, UpdateExpenseRequest},
    repo::ExpenseRepo,
    repo_types::{CategoryTotal, Expense, ExpenseFilter, PageRequest},
    validation,
};
use crate::{
    error::{AppError, AppResult},
    response::Pagination,
};

fn not_found() -> AppError {
    AppError::NotFound("Expense not found".into())
}

pub async fn create(
    repo: &dyn ExpenseRepo,
    owner: Uuid,
    req: CreateExpenseRequest,
    today: Date,
) -> AppResult<Expense> {
    let new = validation::validate_create(req, today)?;
    let expense = repo.insert(owner, new).await?;
    info!(expense_id = %expense.id, user_id = %owner, "expense created");
    Ok(expense)
}

pub async fn list(
    repo: &dyn ExpenseRepo,
    owner: Uuid,
    filter: &ExpenseFilter,
    page: PageRequest,
) -> AppResult<(Vec<Expense>, Pagination)> {
    let (items, total) = repo.list(owner, filter, page).await?;
    Ok((items, Pagination::new(page.page, page.limit, total)))
}

pub async fn get(repo: &dyn ExpenseRepo, owner: Uuid, id: Uuid) -> AppResult<Expense> {
    repo.find(owner, id).await?.ok_or_else(not_found)
}

/// Last writer wins; there is no version check between read and write.
pub async fn update(
    repo: &dyn ExpenseRepo,
    owner: Uuid,
    id: Uuid,
    req: UpdateExpenseRequest,
    today: Date,
) -> AppResult<Expense> {
    let existing = repo.find(owner, id).await?.ok_or_else(not_found)?;
    let changes = validation::parse_changes(req)?;
    let merged = changes.apply(existing);
    validation::validate_expense(&merged, today)?;

    let updated = repo.update(owner, &merged).await?.ok_or_else(|| {
        warn!(expense_id = %id, user_id = %owner, "expense vanished during update");
        not_found()
    })?;
    info!(expense_id = %id, user_id = %owner, "expense updated");
    Ok(updated)
}

pub async fn delete(repo: &dyn ExpenseRepo, owner: Uuid, id: Uuid) -> AppResult<Expense> {
    let deleted = repo.delete(owner, id).await?.ok_or_else(not_found)?;
    info!(expense_id = %id, user_id = %owner, "expense deleted");
    Ok(deleted)
}

pub async fn summarize(
    repo: &dyn ExpenseRepo,
    owner: Uuid,
    filter: &ExpenseFilter,
) -> AppResult<ExpenseSummary> {
    let totals = repo.category_totals(owner, &filter.dates_only()).await?;
    Ok(build_summary(totals))
}

fn round_one_decimal(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn build_summary(totals: Vec<CategoryTotal>) -> ExpenseSummary {
    let total_amount: f64 = totals.iter().map(|t| t.total).sum();
    let total_count: i64 = totals.iter().map(|t| t.count).sum();

    let mut category_breakdown: Vec<CategorySummary> = totals
        .into_iter()
        .map(|t| CategorySummary {
            category: t.category,
            total: t.total,
            count: t.count,
            percentage: if total_amount > 0.0 {
                round_one_decimal(t.total / total_amount * 100.0)
            } else {
                0.0
            },
        })
        .collect();
    category_breakdown.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.as_str().cmp(b.category.as_str()))
    });

    ExpenseSummary {
        total_amount,
        total_count,
        category_breakdown,
    }
}
