//! Check-in/check-out windows and the half-open overlap test.

use crate::error::{HotelError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

const SECONDS_PER_DAY: i64 = 86_400;

/// A validated stay: `check_in < check_out`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct StayWindow {
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
}

impl StayWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::Validation`] if check-out is not after check-in.
    pub fn new(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Result<Self> {
        if check_out <= check_in {
            return Err(HotelError::validation(
                "check_out must be after check_in",
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Parses both ends from client input. Accepts RFC 3339 timestamps or
    /// bare `YYYY-MM-DD` dates (midnight UTC).
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::Validation`] naming the field that failed to
    /// parse, or if the window is empty.
    pub fn parse(check_in: &str, check_out: &str) -> Result<Self> {
        let check_in = parse_date("check_in", check_in)?;
        let check_out = parse_date("check_out", check_out)?;
        Self::new(check_in, check_out)
    }

    /// Arrival instant.
    #[must_use]
    pub const fn check_in(&self) -> DateTime<Utc> {
        self.check_in
    }

    /// Departure instant.
    #[must_use]
    pub const fn check_out(&self) -> DateTime<Utc> {
        self.check_out
    }

    /// `ceil((check_out - check_in) / 1 day)`, at least 1.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn nights(&self) -> u32 {
        let seconds = (self.check_out - self.check_in).num_seconds();
        let nights = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
        nights.clamp(1, i64::from(u32::MAX)) as u32
    }

    /// Half-open overlap: `self.in < other.out && self.out > other.in`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.check_in < other.check_out && self.check_out > other.check_in
    }

    /// Whether the stay begins on the given calendar day (time ignored).
    #[must_use]
    pub fn starts_on(&self, day: NaiveDate) -> bool {
        self.check_in.date_naive() == day
    }
}

fn parse_date(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(HotelError::validation(format!("{field} is required")));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| HotelError::validation(format!("{field} is not a valid date: {raw}")))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_windows() {
        assert!(StayWindow::new(day(3), day(3)).is_err());
        assert!(StayWindow::new(day(4), day(3)).is_err());
    }

    #[test]
    fn nights_round_up_partial_days() {
        let w = StayWindow::new(day(1), day(3)).unwrap();
        assert_eq!(w.nights(), 2);

        let late = Utc.with_ymd_and_hms(2026, 3, 1, 15, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2026, 3, 3, 11, 0, 0).unwrap();
        assert_eq!(StayWindow::new(late, early).unwrap().nights(), 2);
    }

    #[test]
    fn back_to_back_stays_do_not_overlap() {
        let a = StayWindow::new(day(1), day(3)).unwrap();
        let b = StayWindow::new(day(3), day(5)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn parse_accepts_dates_and_timestamps() {
        let w = StayWindow::parse("2026-03-01", "2026-03-03T11:00:00Z").unwrap();
        assert_eq!(w.check_in(), day(1));
        assert_eq!(w.nights(), 3);
    }

    #[test]
    fn parse_names_offending_field() {
        let err = StayWindow::parse("2026-03-01", "next tuesday").unwrap_err();
        assert!(err.to_string().contains("check_out"));
        let err = StayWindow::parse("", "2026-03-03").unwrap_err();
        assert!(err.to_string().contains("check_in"));
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in 0i64..60, la in 1i64..10, b in 0i64..60, lb in 1i64..10) {
            let base = day(1);
            let wa = StayWindow::new(base + chrono::Duration::days(a), base + chrono::Duration::days(a + la)).unwrap();
            let wb = StayWindow::new(base + chrono::Duration::days(b), base + chrono::Duration::days(b + lb)).unwrap();
            prop_assert_eq!(wa.overlaps(&wb), wb.overlaps(&wa));
            prop_assert!(wa.overlaps(&wa));
        }
    }
}
