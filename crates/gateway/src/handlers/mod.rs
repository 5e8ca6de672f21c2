//! API handlers module

pub mod admin;
pub mod articles;
pub mod categories;
pub mod generation;
pub mod health;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use pressforge_common::errors::{AppError, Result};
use validator::Validate;

/// Unwrap a JSON body, mapping extractor and validation failures to 400s
pub(crate) fn parse_body<T: Validate>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    let Json(value) = body.map_err(|rejection| AppError::InvalidFormat {
        message: rejection.body_text(),
    })?;

    value.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: e.field_errors().keys().next().map(|k| k.to_string()),
    })?;

    Ok(value)
}

/// A required string field that must be present and non-blank
pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::MissingField {
            field: field.to_string(),
        })
}

/// Clamp pagination parameters to sane bounds
pub(crate) fn page_params(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    const DEFAULT_LIMIT: u64 = 10;
    const MAX_LIMIT: u64 = 100;

    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params() {
        assert_eq!(page_params(None, None), (1, 10));
        assert_eq!(page_params(Some(0), Some(0)), (1, 1));
        assert_eq!(page_params(Some(3), Some(500)), (3, 100));
    }

    #[test]
    fn test_required_rejects_blank() {
        assert!(required(&None, "query").is_err());
        assert!(required(&Some("  ".into()), "query").is_err());
        assert_eq!(required(&Some(" tides ".into()), "query").unwrap(), "tides");
    }
}
