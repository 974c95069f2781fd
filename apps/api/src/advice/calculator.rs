// Request validation and the deterministic tax arithmetic.
// Everything here is pure: no IO, no model calls, injectable tax rate.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Body of `POST /calculate-tax`. Amounts are yearly figures in euros.
/// Fields arrive as `Option` so missing values produce this service's own
/// validation errors instead of a bare deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
pub struct TaxRequest {
    pub income: Option<f64>,
    pub expenses: Option<f64>,
    pub tax_year: Option<String>,
    pub country: Option<String>,
    pub marital_status: Option<String>,
}

/// Body of `POST /ask-question`: the same financial profile plus a
/// free-text question. An absent question is allowed and treated as empty.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    #[serde(flatten)]
    pub tax: TaxRequest,
    #[serde(default)]
    pub question: String,
}

/// Validated figures plus the derived amounts, computed once per request
/// and reused by both the prompt and the response header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TaxComputation {
    pub income: f64,
    pub expenses: f64,
    pub taxable_income: f64,
    pub estimated_tax: f64,
}

/// Validates a request and computes the derived amounts.
/// `income < expenses` is legal and yields negative taxable income and tax;
/// the numbers are reported as-is and the model is left to comment on them.
pub fn validate_and_compute(request: &TaxRequest, tax_rate: f64) -> Result<TaxComputation, AppError> {
    let income = require_amount("income", request.income)?;
    let expenses = require_amount("expenses", request.expenses)?;

    let taxable_income = income - expenses;
    let estimated_tax = taxable_income * tax_rate;

    Ok(TaxComputation {
        income,
        expenses,
        taxable_income,
        estimated_tax,
    })
}

fn require_amount(field: &str, value: Option<f64>) -> Result<f64, AppError> {
    let value = value
        .ok_or_else(|| AppError::Validation(format!("Field '{field}' is required")))?;

    // JSON has no infinity literal, but "1e999" overflows to one.
    if !value.is_finite() {
        return Err(AppError::Validation(format!(
            "Field '{field}' must be a finite number"
        )));
    }
    if value < 0.0 {
        return Err(AppError::Validation(format!(
            "Field '{field}' must not be negative"
        )));
    }

    Ok(value)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
