// 📐 Validator - required-field checks for a candidate country
//
// Pure predicate: no side effects, called before every insert and update.

use crate::country::ExternalCountry;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// VALIDATION ERROR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    /// Name is missing, blank, or not a string
    #[error("name is required")]
    MissingName,

    /// Population is missing, negative, fractional, or not a number
    #[error("population is required")]
    MissingPopulation,

    /// Currency code is neither null nor a string
    #[error("currency_code is invalid")]
    InvalidCurrencyCode,
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingName => "name",
            ValidationError::MissingPopulation => "population",
            ValidationError::InvalidCurrencyCode => "currency_code",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingName | ValidationError::MissingPopulation => "is required",
            ValidationError::InvalidCurrencyCode => "must be null or a string",
        }
    }
}

// ============================================================================
// VALIDATED CANDIDATE
// ============================================================================

/// Required fields after they passed validation, in their typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCandidate {
    pub name: String,
    pub population: u64,
    pub currency_code: Option<String>,
}

pub type ValidationResult = Result<ValidCandidate, ValidationError>;

/// Validate the required fields of a candidate record.
///
/// Zero population is valid. An empty currency code string is read as null.
pub fn validate(name: &Value, population: &Value, currency_code: &Value) -> ValidationResult {
    let name = match name {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        _ => return Err(ValidationError::MissingName),
    };

    let population = parse_population(population).ok_or(ValidationError::MissingPopulation)?;

    let currency_code = match currency_code {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        _ => return Err(ValidationError::InvalidCurrencyCode),
    };

    Ok(ValidCandidate {
        name,
        population,
        currency_code,
    })
}

/// Validate a snapshot entry using its first listed currency.
pub fn validate_entry(entry: &ExternalCountry) -> ValidationResult {
    validate(&entry.name, &entry.population, &entry.first_currency_code())
}

/// Largest population the store can hold (an SQLite INTEGER)
pub const MAX_POPULATION: u64 = i64::MAX as u64;

fn parse_population(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };

    let population = match number.as_u64() {
        Some(n) => n,
        None => {
            // Whole floats such as 1000000.0 are accepted
            let n = number.as_f64()?;
            if !(n.is_finite() && n >= 0.0 && n.fract() == 0.0) {
                return None;
            }
            n as u64
        }
    };

    (population <= MAX_POPULATION).then_some(population)
}

// ============================================================================
// TESTS
// ============================================================================
