//! Input validation for expense submissions and edits.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::ExpenseError;
use super::types::SubmitExpenseInput;

/// Maximum title length, in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length of category, sub-category, type, payment method and
/// invoice number, in characters.
pub const MAX_LABEL_LENGTH: usize = 100;

/// Maximum recurrence cycle length, in characters.
pub const MAX_CYCLE_LENGTH: usize = 50;

/// Decimal places kept for amounts.
pub const AMOUNT_SCALE: u32 = 4;

/// Decimal places kept for tax rates.
pub const TAX_RATE_SCALE: u32 = 2;

const MAX_TAX_RATE: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Amounts must stay below 10^15.
const AMOUNT_LIMIT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Expense fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedExpense {
    /// Trimmed title.
    pub title: String,
    /// Description, `None` when blank.
    pub description: Option<String>,
    /// Positive amount.
    pub amount: Decimal,
    /// Trimmed category.
    pub category: String,
    /// Sub-category, `None` when blank.
    pub sub_category: Option<String>,
    /// Expense date.
    pub expense_date: NaiveDate,
    /// Expense type.
    pub expense_type: Option<String>,
    /// Recurring flag.
    pub is_recurring: bool,
    /// Recurrence cycle, cleared when not recurring.
    pub recurring_cycle: Option<String>,
    /// Payment method.
    pub payment_method: Option<String>,
    /// Invoice number.
    pub invoice_number: Option<String>,
    /// Receipt location.
    pub receipt_url: Option<String>,
    /// Attachments, blanks removed.
    pub attachment_urls: Vec<String>,
    /// Tax included flag.
    pub tax_included: bool,
    /// Tax rate in percent.
    pub tax_rate: Option<Decimal>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<(), ExpenseError> {
    if value.chars().count() > max {
        return Err(ExpenseError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

fn bounded(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ExpenseError> {
    let value = non_blank(value);
    if let Some(v) = &value {
        check_length(field, v, max)?;
    }
    Ok(value)
}

fn check_scale(field: &'static str, value: Decimal, scale: u32) -> Result<(), ExpenseError> {
    if value.normalize().scale() > scale {
        return Err(ExpenseError::validation(
            field,
            format!("must have at most {scale} decimal places"),
        ));
    }
    Ok(())
}

/// Validates a submission or edit payload.
///
/// # Errors
///
/// Returns `ExpenseError::Validation` naming the first offending field.
pub fn validate_expense_input(input: SubmitExpenseInput) -> Result<ValidatedExpense, ExpenseError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(ExpenseError::validation("title", "is required"));
    }
    check_length("title", &title, MAX_TITLE_LENGTH)?;

    if input.amount <= Decimal::ZERO {
        return Err(ExpenseError::validation("amount", "must be greater than zero"));
    }
    check_scale("amount", input.amount, AMOUNT_SCALE)?;
    if input.amount >= AMOUNT_LIMIT {
        return Err(ExpenseError::validation("amount", "must be less than 10^15"));
    }

    let category = input.category.trim().to_string();
    if category.is_empty() {
        return Err(ExpenseError::validation("category", "is required"));
    }
    check_length("category", &category, MAX_LABEL_LENGTH)?;

    let expense_date = input
        .expense_date
        .ok_or_else(|| ExpenseError::validation("expense_date", "is required"))?;

    if let Some(rate) = input.tax_rate {
        if rate < Decimal::ZERO || rate > MAX_TAX_RATE {
            return Err(ExpenseError::validation(
                "tax_rate",
                "must be between 0 and 100",
            ));
        }
        check_scale("tax_rate", rate, TAX_RATE_SCALE)?;
    }

    let sub_category = bounded("sub_category", input.sub_category, MAX_LABEL_LENGTH)?;
    let expense_type = bounded("expense_type", input.expense_type, MAX_LABEL_LENGTH)?;
    let payment_method = bounded("payment_method", input.payment_method, MAX_LABEL_LENGTH)?;
    let invoice_number = bounded("invoice_number", input.invoice_number, MAX_LABEL_LENGTH)?;

    let recurring_cycle = if input.is_recurring {
        bounded("recurring_cycle", input.recurring_cycle, MAX_CYCLE_LENGTH)?
    } else {
        None
    };
    if input.is_recurring && recurring_cycle.is_none() {
        return Err(ExpenseError::validation(
            "recurring_cycle",
            "is required for recurring expenses",
        ));
    }

    Ok(ValidatedExpense {
        title,
        description: non_blank(input.description),
        amount: input.amount,
        category,
        sub_category,
        expense_date,
        expense_type,
        is_recurring: input.is_recurring,
        recurring_cycle,
        payment_method,
        invoice_number,
        receipt_url: non_blank(input.receipt_url),
        attachment_urls: input
            .attachment_urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect(),
        tax_included: input.tax_included,
        tax_rate: input.tax_rate,
    })
}

/// Validates a rejection reason and returns it trimmed.
///
/// # Errors
///
/// Returns `ExpenseError::Validation` if the reason is missing or blank.
pub fn validate_rejection_reason(reason: Option<&str>) -> Result<String, ExpenseError> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| ExpenseError::validation("rejection_reason", "is required"))
}
