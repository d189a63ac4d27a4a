use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CreateExpenseRequest, ExpenseSummary, ListQuery, SummaryQuery, UpdateExpenseRequest},
    repo_types::{Expense, PageRequest},
    services, validation,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    response::{created, ok, Envelope},
    state::AppState,
};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/statistics/summary", get(expense_summary))
        .route(
            "/expenses/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

/// Malformed ids are indistinguishable from ids that belong to nobody.
fn parse_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Expense not found".into()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_expense(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Envelope<Expense>>)> {
    let Json(payload) = payload?;
    let expense = services::create(
        state.expenses.as_ref(),
        user.id,
        payload,
        validation::today(),
    )
    .await?;
    Ok(created(
        Envelope::data(expense).with_message("Expense created successfully"),
    ))
}

#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn list_expenses(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<Envelope<Vec<Expense>>>> {
    let Query(query) = query?;
    let filter = validation::list_filter(&query)?;
    let page = PageRequest::new(query.page, query.limit);
    let (items, pagination) =
        services::list(state.expenses.as_ref(), user.id, &filter, page).await?;
    Ok(Json(Envelope::data(items).with_pagination(pagination)))
}

#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn expense_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> AppResult<Json<Envelope<ExpenseSummary>>> {
    let Query(query) = query?;
    let filter = validation::summary_filter(&query)?;
    let summary = services::summarize(state.expenses.as_ref(), user.id, &filter).await?;
    Ok(Json(Envelope::data(summary)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_expense(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Envelope<Expense>>> {
    let expense = services::get(state.expenses.as_ref(), user.id, parse_id(&id)?).await?;
    Ok(Json(Envelope::data(expense)))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_expense(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateExpenseRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Envelope<Expense>>)> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let expense = services::update(
        state.expenses.as_ref(),
        user.id,
        id,
        payload,
        validation::today(),
    )
    .await?;
    Ok(ok(
        Envelope::data(expense).with_message("Expense updated successfully"),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Envelope<Expense>>)> {
    let expense = services::delete(state.expenses.as_ref(), user.id, parse_id(&id)?).await?;
    Ok(ok(
        Envelope::data(expense).with_message("Expense deleted successfully"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_id_is_not_found() {
        assert!(matches!(parse_id("not-a-uuid"), Err(AppError::NotFound(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}
