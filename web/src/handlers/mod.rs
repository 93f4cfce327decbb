//! HTTP handlers and their JSON shapes.
//!
//! Amounts cross the wire as decimal numbers and dates as RFC 3339 strings
//! (bare `YYYY-MM-DD` is accepted on input). Field names are `snake_case`.

pub mod bookings;
pub mod health;
pub mod reservations;
pub mod rooms;

use crate::error::AppError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use hotel_core::{HotelError, Money, StayWindow};

/// Unwraps a JSON body, reporting malformed input as a validation error.
pub(crate) fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| HotelError::validation(rejection.body_text()).into())
}

/// A field the request must carry.
pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T, HotelError> {
    value.ok_or_else(|| HotelError::validation(format!("{field} is required")))
}

/// Decimal amount from the wire.
pub(crate) fn amount(value: f64, field: &str) -> Result<Money, HotelError> {
    Money::from_decimal(value)
        .ok_or_else(|| HotelError::validation(format!("{field} must be a non-negative amount")))
}

/// Stay window from two optional wire dates.
pub(crate) fn stay(check_in: Option<&str>, check_out: Option<&str>) -> Result<StayWindow, HotelError> {
    StayWindow::parse(
        required(check_in, "check_in")?,
        required(check_out, "check_out")?,
    )
}

/// Parses a status name, listing the accepted values on failure.
pub(crate) fn status<T: Copy>(
    value: &str,
    parse: fn(&str) -> Option<T>,
    all: &[T],
    name: fn(T) -> &'static str,
) -> Result<T, HotelError> {
    parse(value).ok_or_else(|| {
        let accepted: Vec<&str> = all.iter().map(|s| name(*s)).collect();
        HotelError::validation(format!(
            "status must be one of: {}",
            accepted.join(", ")
        ))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hotel_core::BookingStatus;

    #[test]
    fn test_missing_fields_are_named() {
        let err = stay(None, Some("2026-03-03")).unwrap_err();
        assert_eq!(err.to_string(), "check_in is required");
        assert!(amount(-1.0, "total_price").is_err());
        assert_eq!(amount(207.0, "total_price").unwrap().cents(), 20_700);
    }

    #[test]
    fn test_status_lists_accepted_values() {
        let ok = status("checked_in", BookingStatus::parse, BookingStatus::ALL, |s| s.as_str());
        assert_eq!(ok.unwrap(), BookingStatus::CheckedIn);

        let err = status("gone", BookingStatus::parse, BookingStatus::ALL, |s| s.as_str());
        assert!(err.unwrap_err().to_string().contains("checked_out"));
    }
}
