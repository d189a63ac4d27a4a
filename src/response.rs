use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Uniform JSON wrapper used by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_expenses: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = u64::from(limit.max(1));
        let total_pages = total.div_ceil(limit) as u32;
        Self {
            current_page: page,
            total_pages,
            total_expenses: total,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: None,
            pagination: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

impl Envelope<()> {
    pub fn failure(message: impl Into<String>, errors: Option<Vec<String>>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
            pagination: None,
        }
    }
}

pub fn ok<T: Serialize>(env: Envelope<T>) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::OK, Json(env))
}

pub fn created<T: Serialize>(env: Envelope<T>) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, Json(env))
}

pub async fn not_found(uri: axum::http::Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::failure(format!("Route not found: {}", uri.path()), None)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_middle_page() {
        let p = Pagination::new(2, 1, 3);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn pagination_last_and_beyond() {
        let last = Pagination::new(3, 1, 3);
        assert!(!last.has_next);
        assert!(last.has_prev);

        let beyond = Pagination::new(7, 10, 25);
        assert_eq!(beyond.total_pages, 3);
        assert_eq!(beyond.total_expenses, 25);
        assert!(!beyond.has_next);
    }

    #[test]
    fn pagination_empty_set() {
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }

    #[test]
    fn envelope_skips_empty_fields() {
        let json = serde_json::to_value(Envelope::data(5).with_message("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "hi", "data": 5}));
    }
}
