//! Attribute validators: one raw text input in, one typed attribute out.

use super::model::Gender;

/// The profile attribute a validator is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Age,
    Gender,
    Weight,
    Height,
    Allergies,
    Goal,
    Timeframe,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Weight => "weight",
            Self::Height => "height",
            Self::Allergies => "allergies",
            Self::Goal => "goal",
            Self::Timeframe => "timeframe",
        };
        write!(f, "{s}")
    }
}

/// Why an input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Empty,
    NotNumeric,
    OutOfRange,
    InvalidEnum,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::NotNumeric => "not_numeric",
            Self::OutOfRange => "out_of_range",
            Self::InvalidEnum => "invalid_enum",
        };
        write!(f, "{s}")
    }
}

/// A user-correctable input error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: Field,
    pub reason: Reason,
}

impl ValidationError {
    pub fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }
}

/// Inclusive age bounds.
pub const MIN_AGE: i64 = 10;
pub const MAX_AGE: i64 = 100;

/// Answer to "do you have allergies?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllergyAnswer {
    Yes,
    No,
}

fn non_empty(field: Field, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, Reason::Empty));
    }
    Ok(trimmed.to_string())
}

pub fn name(raw: &str) -> Result<String, ValidationError> {
    non_empty(Field::Name, raw)
}

pub fn age(raw: &str) -> Result<u8, ValidationError> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::new(Field::Age, Reason::NotNumeric))?;
    if !(MIN_AGE..=MAX_AGE).contains(&value) {
        return Err(ValidationError::new(Field::Age, Reason::OutOfRange));
    }
    // Bounds above keep this in u8 range.
    u8::try_from(value).map_err(|_| ValidationError::new(Field::Age, Reason::OutOfRange))
}

pub fn gender(raw: &str) -> Result<Gender, ValidationError> {
    match raw.trim().to_lowercase().as_str() {
        "м" => Ok(Gender::Male),
        "ж" => Ok(Gender::Female),
        _ => Err(ValidationError::new(Field::Gender, Reason::InvalidEnum)),
    }
}

/// Kilograms; accepts both `.` and `,` as the decimal separator.
///
/// No bounds are enforced: zero and negative weights are accepted.
pub fn weight(raw: &str) -> Result<f64, ValidationError> {
    let value: f64 = raw
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| ValidationError::new(Field::Weight, Reason::NotNumeric))?;
    // NaN and infinities cannot be stored in a REAL column.
    if !value.is_finite() {
        return Err(ValidationError::new(Field::Weight, Reason::NotNumeric));
    }
    Ok(value)
}

/// Centimetres. Unbounded, like weight.
pub fn height(raw: &str) -> Result<i32, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::new(Field::Height, Reason::NotNumeric))
}

/// Only "да" (any case) means yes; everything else means no.
pub fn allergy_confirmation(raw: &str) -> AllergyAnswer {
    if raw.trim().to_lowercase() == "да" {
        AllergyAnswer::Yes
    } else {
        AllergyAnswer::No
    }
}

/// Comma-separated free text, stored as typed.
pub fn allergies(raw: &str) -> Result<String, ValidationError> {
    non_empty(Field::Allergies, raw)
}

pub fn goal(raw: &str) -> Result<String, ValidationError> {
    non_empty(Field::Goal, raw)
}

pub fn timeframe(raw: &str) -> Result<String, ValidationError> {
    non_empty(Field::Timeframe, raw)
}
