use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repo_types::{CategoryTotal, Expense, ExpenseFilter, NewExpense, PageRequest};
use crate::error::AppResult;

const EXPENSE_COLUMNS: &str =
    "id, user_id, title, amount, category, date, description, created_at, updated_at";

/// Persistence seam for expenses. Every call is scoped to `owner`.
#[async_trait]
pub trait ExpenseRepo: Send + Sync {
    async fn insert(&self, owner: Uuid, expense: NewExpense) -> AppResult<Expense>;

    /// One page ordered by date desc, then creation time desc, plus the
    /// total number of matching rows.
    async fn list(
        &self,
        owner: Uuid,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Expense>, u64)>;

    async fn find(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Expense>>;

    /// Overwrites the mutable fields of `expense`; `None` if it is gone.
    async fn update(&self, owner: Uuid, expense: &Expense) -> AppResult<Option<Expense>>;

    async fn delete(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Expense>>;

    /// Sum and count per category over every matching row.
    async fn category_totals(
        &self,
        owner: Uuid,
        filter: &ExpenseFilter,
    ) -> AppResult<Vec<CategoryTotal>>;
}

#[derive(Clone)]
pub struct PgExpenseRepo {
    db: PgPool,
}

impl PgExpenseRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Escapes LIKE metacharacters so the search term is matched literally.
fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, owner: Uuid, filter: &ExpenseFilter) {
    qb.push(" WHERE user_id = ").push_bind(owner);
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND date <= ").push_bind(end);
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        qb.push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl ExpenseRepo for PgExpenseRepo {
    async fn insert(&self, owner: Uuid, expense: NewExpense) -> AppResult<Expense> {
        let row = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expenses (user_id, title, amount, category, date, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(owner)
        .bind(&expense.title)
        .bind(expense.amount)
        .bind(expense.category)
        .bind(expense.date)
        .bind(&expense.description)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn list(
        &self,
        owner: Uuid,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Expense>, u64)> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {EXPENSE_COLUMNS} FROM expenses"));
        push_where(&mut qb, owner, filter);
        qb.push(" ORDER BY date DESC, created_at DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);
        let rows = qb.build_query_as::<Expense>().fetch_all(&self.db).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM expenses");
        push_where(&mut count, owner, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.db).await?;

        Ok((rows, total.max(0) as u64))
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Expense>> {
        let row = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, owner: Uuid, expense: &Expense) -> AppResult<Option<Expense>> {
        let row = sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE expenses
               SET title = $3, amount = $4, category = $5, date = $6,
                   description = $7, updated_at = now()
             WHERE id = $1 AND user_id = $2
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(expense.id)
        .bind(owner)
        .bind(&expense.title)
        .bind(expense.amount)
        .bind(expense.category)
        .bind(expense.date)
        .bind(&expense.description)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Expense>> {
        let row = sqlx::query_as::<_, Expense>(&format!(
            "DELETE FROM expenses WHERE id = $1 AND user_id = $2 RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn category_totals(
        &self,
        owner: Uuid,
        filter: &ExpenseFilter,
    ) -> AppResult<Vec<CategoryTotal>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT category, SUM(amount) AS total, COUNT(*) AS count FROM expenses",
        );
        push_where(&mut qb, owner, filter);
        qb.push(" GROUP BY category ORDER BY category");
        let rows = qb
            .build_query_as::<CategoryTotal>()
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("coffee"), "%coffee%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn where_clause_composes_all_predicates() {
        let filter = ExpenseFilter {
            category: Some("Food".into()),
            start_date: Some(date!(2024 - 01 - 01)),
            end_date: Some(date!(2024 - 01 - 31)),
            search: Some("bean".into()),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM expenses");
        push_where(&mut qb, Uuid::nil(), &filter);
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM expenses WHERE user_id = $1 AND category = $2 AND date >= $3 \
             AND date <= $4 AND (title ILIKE $5 OR description ILIKE $6)"
        );
    }

    #[test]
    fn where_clause_without_filters_is_owner_only() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM expenses");
        push_where(&mut qb, Uuid::nil(), &ExpenseFilter::default());
        assert_eq!(qb.sql(), "SELECT 1 FROM expenses WHERE user_id = $1");
    }
}
