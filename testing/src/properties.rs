//! Property-test strategies.

use crate::fixtures::march;
use chrono::Duration;
use hotel_core::StayWindow;
use proptest::prelude::*;

/// Stays of 1 to 7 nights starting within March 2026 (with overflow into
/// April).
pub fn stays() -> impl Strategy<Value = StayWindow> {
    (0i64..31, 1i64..8).prop_filter_map("non-empty window", |(offset, nights)| {
        let check_in = march(1) + Duration::days(offset);
        StayWindow::new(check_in, check_in + Duration::days(nights)).ok()
    })
}
