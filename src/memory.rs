use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::UserRepo,
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult},
    expenses::{
        repo::ExpenseRepo,
        repo_types::{Category, CategoryTotal, Expense, ExpenseFilter, NewExpense, PageRequest},
    },
};

struct StoredExpense {
    seq: u64,
    expense: Expense,
}

#[derive(Default)]
struct Expenses {
    next_seq: u64,
    rows: Vec<StoredExpense>,
}

/// Process-local store with the same semantics as the Postgres repos.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    expenses: RwLock<Expenses>,
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(AppError::Conflict(
                "User already exists with this email or username".into(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }
}

#[async_trait]
impl ExpenseRepo for MemoryStore {
    async fn insert(&self, owner: Uuid, new: NewExpense) -> AppResult<Expense> {
        let now = OffsetDateTime::now_utc();
        let expense = Expense {
            id: Uuid::new_v4(),
            user_id: owner,
            title: new.title,
            amount: new.amount,
            category: new.category,
            date: new.date,
            description: new.description,
            created_at: now,
            updated_at: now,
        };
        let mut store = self.expenses.write().await;
        let seq = store.next_seq;
        store.next_seq += 1;
        store.rows.push(StoredExpense {
            seq,
            expense: expense.clone(),
        });
        Ok(expense)
    }

    async fn list(
        &self,
        owner: Uuid,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Expense>, u64)> {
        let store = self.expenses.read().await;
        let mut matching: Vec<&StoredExpense> = store
            .rows
            .iter()
            .filter(|s| s.expense.user_id == owner && filter.matches(&s.expense))
            .collect();
        // seq breaks ties between rows created within the same clock tick
        matching.sort_by(|a, b| {
            (b.expense.date, b.expense.created_at, b.seq).cmp(&(
                a.expense.date,
                a.expense.created_at,
                a.seq,
            ))
        });
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .map(|s| s.expense.clone())
            .collect();
        Ok((items, total))
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Expense>> {
        Ok(self
            .expenses
            .read()
            .await
            .rows
            .iter()
            .find(|s| s.expense.id == id && s.expense.user_id == owner)
            .map(|s| s.expense.clone()))
    }

    async fn update(&self, owner: Uuid, expense: &Expense) -> AppResult<Option<Expense>> {
        let mut store = self.expenses.write().await;
        let Some(slot) = store
            .rows
            .iter_mut()
            .find(|s| s.expense.id == expense.id && s.expense.user_id == owner)
        else {
            return Ok(None);
        };
        let row = &mut slot.expense;
        row.title = expense.title.clone();
        row.amount = expense.amount;
        row.category = expense.category;
        row.date = expense.date;
        row.description = expense.description.clone();
        row.updated_at = OffsetDateTime::now_utc();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> AppResult<Option<Expense>> {
        let mut store = self.expenses.write().await;
        let pos = store
            .rows
            .iter()
            .position(|s| s.expense.id == id && s.expense.user_id == owner);
        Ok(pos.map(|i| store.rows.remove(i).expense))
    }

    async fn category_totals(
        &self,
        owner: Uuid,
        filter: &ExpenseFilter,
    ) -> AppResult<Vec<CategoryTotal>> {
        let store = self.expenses.read().await;
        let mut totals: HashMap<Category, (f64, i64)> = HashMap::new();
        for s in store
            .rows
            .iter()
            .filter(|s| s.expense.user_id == owner && filter.matches(&s.expense))
        {
            let entry = totals.entry(s.expense.category).or_default();
            entry.0 += s.expense.amount;
            entry.1 += 1;
        }
        let mut rows: Vec<CategoryTotal> = totals
            .into_iter()
            .map(|(category, (total, count))| CategoryTotal {
                category,
                total,
                count,
            })
            .collect();
        rows.sort_by(|a, b| a.category.as_str().cmp(b.category.as_str()));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn new_expense(title: &str, category: Category) -> NewExpense {
        NewExpense {
            title: title.into(),
            amount: 5.0,
            category,
            date: date!(2024 - 01 - 01),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn user_uniqueness_is_enforced_on_insert() {
        let store = MemoryStore::default();
        let new = |username: &str, email: &str| NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "h".into(),
        };
        store.create(new("alice", "a@x.io")).await.unwrap();
        assert!(matches!(
            store.create(new("alice", "b@x.io")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            store.create(new("bob", "a@x.io")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn same_date_rows_list_newest_first() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        let first = store.insert(owner, new_expense("first", Category::Food)).await.unwrap();
        let second = store.insert(owner, new_expense("second", Category::Food)).await.unwrap();
        let (items, total) = store
            .list(owner, &ExpenseFilter::default(), PageRequest::new(None, None))
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].id, second.id);
        assert_eq!(items[1].id, first.id);
    }

    #[tokio::test]
    async fn totals_group_by_category() {
        let store = MemoryStore::default();
        let owner = Uuid::new_v4();
        store.insert(owner, new_expense("a", Category::Food)).await.unwrap();
        store.insert(owner, new_expense("b", Category::Food)).await.unwrap();
        store.insert(owner, new_expense("c", Category::Other)).await.unwrap();
        let totals = store
            .category_totals(owner, &ExpenseFilter::default())
            .await
            .unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, Category::Food);
        assert_eq!(totals[0].total, 10.0);
        assert_eq!(totals[0].count, 2);
        assert_eq!(totals[1].category, Category::Other);
    }
}
