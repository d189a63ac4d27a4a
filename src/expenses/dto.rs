use serde::{Deserialize, Deserializer, Serialize};

use super::repo_types::Category;

/// The client form posts amounts as strings; API clients send numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateExpenseRequest {
    pub title: Option<String>,
    pub amount: Option<AmountInput>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateExpenseRequest {
    pub title: Option<String>,
    pub amount: Option<AmountInput>,
    pub category: Option<String>,
    pub date: Option<String>,
    /// Outer `None`: key absent. `Some(None)`: explicit `null`.
    #[serde(deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

fn present<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: Category,
    pub total: f64,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSummary {
    pub total_amount: f64,
    pub total_count: i64,
    pub category_breakdown: Vec<CategorySummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_accepts_number_or_text() {
        let req: CreateExpenseRequest =
            serde_json::from_str(r#"{"amount": 4}"#).unwrap();
        assert_eq!(req.amount, Some(AmountInput::Number(4.0)));
        let req: CreateExpenseRequest =
            serde_json::from_str(r#"{"amount": "4.50"}"#).unwrap();
        assert_eq!(req.amount, Some(AmountInput::Text("4.50".into())));
    }

    #[test]
    fn update_description_distinguishes_absent_null_and_empty() {
        let absent: UpdateExpenseRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.description, None);
        let null: UpdateExpenseRequest =
            serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(null.description, Some(None));
        let empty: UpdateExpenseRequest =
            serde_json::from_str(r#"{"description": ""}"#).unwrap();
        assert_eq!(empty.description, Some(Some(String::new())));
    }

    #[test]
    fn list_query_uses_camel_case_keys() {
        let q: ListQuery = serde_json::from_str(
            r#"{"startDate":"2024-01-01","endDate":"2024-01-31","page":2}"#,
        )
        .unwrap();
        assert_eq!(q.start_date.as_deref(), Some("2024-01-01"));
        assert_eq!(q.end_date.as_deref(), Some("2024-01-31"));
        assert_eq!(q.page, Some(2));
        assert_eq!(q.limit, None);
    }
}
