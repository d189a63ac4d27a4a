use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    UtcOffset,
};

use super::{
    dto::{AmountInput, CreateExpenseRequest, ListQuery, SummaryQuery, UpdateExpenseRequest},
    repo_types::{Category, Expense, ExpenseChanges, ExpenseFilter, NewExpense},
};
use crate::error::{AppError, AppResult};

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;

const MISSING_FIELDS: &str =
    "Please provide all required fields: title, amount, category, and date";

fn blank(s: &Option<String>) -> bool {
    s.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// `Ok(None)` for a blank string.
fn parse_amount(input: &AmountInput) -> Result<Option<f64>, String> {
    let value = match input {
        AmountInput::Number(n) => *n,
        AmountInput::Text(s) if s.trim().is_empty() => return Ok(None),
        AmountInput::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| "Amount must be a number".to_string())?,
    };
    if value.is_finite() {
        Ok(Some(value))
    } else {
        Err("Amount must be a number".to_string())
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (reduced to its UTC date).
pub fn parse_date(raw: &str) -> Result<Date, String> {
    let raw = raw.trim();
    if let Ok(d) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Ok(d);
    }
    OffsetDateTime::parse(raw, &Rfc3339)
        .map(|ts| ts.to_offset(UtcOffset::UTC).date())
        .map_err(|_| format!("Invalid date: {raw}"))
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn rule_errors(title: &str, amount: f64, date: Date, description: &str, today: Date) -> Vec<String> {
    let mut errors = Vec::new();
    if title.chars().count() > TITLE_MAX {
        errors.push(format!("Title cannot exceed {TITLE_MAX} characters"));
    }
    if amount < 0.0 {
        errors.push("Amount cannot be negative".to_string());
    }
    if date > today {
        errors.push("Expense date cannot be in the future".to_string());
    }
    if description.chars().count() > DESCRIPTION_MAX {
        errors.push(format!("Description cannot exceed {DESCRIPTION_MAX} characters"));
    }
    errors
}

fn finish<T>(value: T, errors: Vec<String>) -> AppResult<T> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn validate_create(req: CreateExpenseRequest, today: Date) -> AppResult<NewExpense> {
    let amount_missing = match &req.amount {
        None => true,
        Some(AmountInput::Text(s)) => s.trim().is_empty(),
        Some(AmountInput::Number(_)) => false,
    };
    if blank(&req.title) || amount_missing || blank(&req.category) || blank(&req.date) {
        return Err(AppError::validation(MISSING_FIELDS));
    }

    let mut errors = Vec::new();
    let amount = match req.amount.as_ref().map(parse_amount) {
        Some(Ok(Some(a))) => a,
        Some(Err(e)) => {
            errors.push(e);
            0.0
        }
        _ => 0.0,
    };
    let category = req
        .category
        .as_deref()
        .unwrap_or_default()
        .trim()
        .parse::<Category>()
        .map_err(|e| errors.push(e))
        .ok();
    let date = parse_date(req.date.as_deref().unwrap_or_default())
        .map_err(|e| errors.push(e))
        .ok();

    let title = req.title.unwrap_or_default().trim().to_string();
    let description = req.description.unwrap_or_default().trim().to_string();
    if let Some(d) = date {
        errors.extend(rule_errors(&title, amount, d, &description, today));
    }

    match (category, date) {
        (Some(category), Some(date)) if errors.is_empty() => Ok(NewExpense {
            title,
            amount,
            category,
            date,
            description,
        }),
        _ => Err(AppError::Validation(errors)),
    }
}

/// Blank or null values leave a field unchanged, and so does an amount of
/// zero. `description` is the exception: any supplied value (including
/// `null` and `""`) is applied.
pub fn parse_changes(req: UpdateExpenseRequest) -> AppResult<ExpenseChanges> {
    let mut errors = Vec::new();
    let mut changes = ExpenseChanges::default();

    if !blank(&req.title) {
        changes.title = req.title.map(|t| t.trim().to_string());
    }
    if let Some(input) = &req.amount {
        match parse_amount(input) {
            Ok(amount) => changes.amount = amount.filter(|a| *a != 0.0),
            Err(e) => errors.push(e),
        }
    }
    if !blank(&req.category) {
        match req.category.as_deref().unwrap_or_default().trim().parse::<Category>() {
            Ok(c) => changes.category = Some(c),
            Err(e) => errors.push(e),
        }
    }
    if !blank(&req.date) {
        match parse_date(req.date.as_deref().unwrap_or_default()) {
            Ok(d) => changes.date = Some(d),
            Err(e) => errors.push(e),
        }
    }
    if let Some(description) = req.description {
        changes.description = Some(description.unwrap_or_default().trim().to_string());
    }

    finish(changes, errors)
}

/// Re-checks a merged record with the create rules.
pub fn validate_expense(e: &Expense, today: Date) -> AppResult<()> {
    finish((), rule_errors(&e.title, e.amount, e.date, &e.description, today))
}

fn parse_date_param(raw: Option<&str>, errors: &mut Vec<String>) -> Option<Date> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    parse_date(raw).map_err(|e| errors.push(e)).ok()
}

pub fn list_filter(q: &ListQuery) -> AppResult<ExpenseFilter> {
    let mut errors = Vec::new();
    let filter = ExpenseFilter {
        category: q
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "All")
            .map(str::to_string),
        start_date: parse_date_param(q.start_date.as_deref(), &mut errors),
        end_date: parse_date_param(q.end_date.as_deref(), &mut errors),
        search: q
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    };
    finish(filter, errors)
}

pub fn summary_filter(q: &SummaryQuery) -> AppResult<ExpenseFilter> {
    let mut errors = Vec::new();
    let filter = ExpenseFilter {
        start_date: parse_date_param(q.start_date.as_deref(), &mut errors),
        end_date: parse_date_param(q.end_date.as_deref(), &mut errors),
        ..Default::default()
    };
    finish(filter, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const TODAY: Date = date!(2024 - 06 - 15);

    fn create(title: &str, amount: AmountInput, category: &str, date: &str) -> CreateExpenseRequest {
        CreateExpenseRequest {
            title: Some(title.into()),
            amount: Some(amount),
            category: Some(category.into()),
            date: Some(date.into()),
            description: None,
        }
    }

    fn errors_of<T: std::fmt::Debug>(r: AppResult<T>) -> Vec<String> {
        match r {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_accepts_today_and_trims() {
        let e = validate_create(
            create("  Coffee ", AmountInput::Number(4.5), "Food", "2024-06-15"),
            TODAY,
        )
        .unwrap();
        assert_eq!(e.title, "Coffee");
        assert_eq!(e.amount, 4.5);
        assert_eq!(e.category, Category::Food);
        assert_eq!(e.date, TODAY);
        assert_eq!(e.description, "");
    }

    #[test]
    fn create_rejects_tomorrow() {
        let errors = errors_of(validate_create(
            create("Coffee", AmountInput::Number(4.5), "Food", "2024-06-16"),
            TODAY,
        ));
        assert_eq!(errors, vec!["Expense date cannot be in the future".to_string()]);
    }

    #[test]
    fn create_requires_all_fields_first() {
        let errors = errors_of(validate_create(
            create("  ", AmountInput::Text("".into()), "Nope", "2024-06-16"),
            TODAY,
        ));
        assert_eq!(errors, vec![MISSING_FIELDS.to_string()]);
    }

    #[test]
    fn create_collects_rule_violations() {
        let mut req = create(&"x".repeat(101), AmountInput::Number(-1.0), "Snacks", "2024-01-01");
        req.description = Some("d".repeat(501));
        let errors = errors_of(validate_create(req, TODAY));
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.starts_with("Category must be one of")));
        assert!(errors.contains(&"Amount cannot be negative".to_string()));
    }

    #[test]
    fn create_parses_text_amount_and_rfc3339_date() {
        let e = validate_create(
            create("Taxi", AmountInput::Text("12.30".into()), "Transportation", "2024-06-14T23:30:00-02:00"),
            TODAY,
        )
        .unwrap();
        assert_eq!(e.amount, 12.3);
        assert_eq!(e.date, TODAY);
    }

    #[test]
    fn create_rejects_non_numeric_amount() {
        let errors = errors_of(validate_create(
            create("Taxi", AmountInput::Text("a lot".into()), "Other", "2024-06-01"),
            TODAY,
        ));
        assert_eq!(errors, vec!["Amount must be a number".to_string()]);
    }

    #[test]
    fn changes_ignore_blank_amount_but_clear_description() {
        let req: UpdateExpenseRequest = serde_json::from_str(
            r#"{"title": "", "amount": "", "category": "", "date": "", "description": ""}"#,
        )
        .unwrap();
        let changes = parse_changes(req).unwrap();
        assert_eq!(
            changes,
            ExpenseChanges {
                description: Some(String::new()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn changes_treat_zero_amount_as_unchanged() {
        for body in [r#"{"amount": 0}"#, r#"{"amount": 0.0}"#, r#"{"amount": "0"}"#, r#"{"amount": " 0.00 "}"#] {
            let req: UpdateExpenseRequest = serde_json::from_str(body).unwrap();
            assert_eq!(parse_changes(req).unwrap().amount, None, "{body}");
        }
        let req: UpdateExpenseRequest = serde_json::from_str(r#"{"amount": "7.25"}"#).unwrap();
        assert_eq!(parse_changes(req).unwrap().amount, Some(7.25));
    }

    #[test]
    fn changes_reject_unknown_category() {
        let req: UpdateExpenseRequest = serde_json::from_str(r#"{"category": "Snacks"}"#).unwrap();
        assert_eq!(errors_of(parse_changes(req)).len(), 1);
    }

    #[test]
    fn list_filter_treats_all_as_no_category() {
        let q = ListQuery {
            category: Some("All".into()),
            search: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(list_filter(&q).unwrap(), ExpenseFilter::default());
    }

    #[test]
    fn list_filter_rejects_bad_dates() {
        let q = ListQuery {
            start_date: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(list_filter(&q).is_err());
    }
}
