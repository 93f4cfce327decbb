//! Nightly rate, tax and total computation.
//!
//! All rounding is half-up to a whole currency unit:
//!
//! ```text
//! price_per_night = discount > 0 ? round(base × (1 - discount/100)) : base
//! subtotal        = price_per_night × nights
//! tax             = round(subtotal × 0.15)
//! total           = subtotal + tax
//! ```

use crate::error::{HotelError, Result};
use crate::money::Money;
use crate::stay::StayWindow;
use crate::types::{RoomId, RoomLine, RoomType};

/// Tax rate in percent.
pub const TAX_PERCENT: u32 = 15;

/// Largest accepted difference between a submitted and a recomputed total.
pub const PRICE_TOLERANCE: Money = Money::from_cents(1);

fn overflow() -> HotelError {
    HotelError::validation("amount out of range")
}

/// Discounted nightly rate, rounded to whole units.
///
/// # Errors
///
/// Returns [`HotelError::Validation`] when the discount is above 100% or
/// the arithmetic overflows.
pub fn nightly_rate(base_price: Money, discount_percent: u32) -> Result<Money> {
    if discount_percent > 100 {
        return Err(HotelError::validation(format!(
            "discount_percent must be between 0 and 100, got {discount_percent}"
        )));
    }
    if discount_percent == 0 {
        return Ok(base_price);
    }
    base_price
        .checked_percent_rounded(100 - discount_percent)
        .ok_or_else(overflow)
}

/// `round(subtotal × 0.15)`.
///
/// # Errors
///
/// Returns [`HotelError::Validation`] on overflow.
pub fn tax_for(subtotal: Money) -> Result<Money> {
    subtotal
        .checked_percent_rounded(TAX_PERCENT)
        .ok_or_else(overflow)
}

/// Priced line for one room over one stay.
///
/// # Errors
///
/// Returns [`HotelError::Validation`] on a bad discount or overflow.
pub fn quote_room(room_type: &RoomType, room_id: RoomId, stay: &StayWindow) -> Result<RoomLine> {
    let price_per_night = nightly_rate(room_type.base_price, room_type.discount_percent)?;
    let nights = stay.nights();
    let subtotal = price_per_night
        .checked_multiply(nights)
        .ok_or_else(overflow)?;
    Ok(RoomLine {
        room_id,
        price_per_night,
        nights,
        subtotal,
    })
}

/// Subtotal, tax and total of a set of room lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Totals {
    /// Sum of line subtotals
    pub subtotal: Money,
    /// 15% of the subtotal
    pub tax: Money,
    /// `subtotal + tax`
    pub total: Money,
}

impl Totals {
    /// Recomputes totals from the lines themselves.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::Validation`] on overflow.
    pub fn from_lines(lines: &[RoomLine]) -> Result<Self> {
        let subtotal = lines.iter().try_fold(Money::ZERO, |acc, line| {
            acc.checked_add(line.subtotal).ok_or_else(overflow)
        })?;
        let tax = tax_for(subtotal)?;
        let total = subtotal.checked_add(tax).ok_or_else(overflow)?;
        Ok(Self {
            subtotal,
            tax,
            total,
        })
    }

    /// Rejects a client-submitted total that differs by more than one cent.
    ///
    /// # Errors
    ///
    /// Returns [`HotelError::PriceMismatch`].
    pub fn verify_submitted(&self, submitted_total: Money) -> Result<()> {
        if self.total.abs_diff(submitted_total) > PRICE_TOLERANCE {
            return Err(HotelError::PriceMismatch {
                expected: self.total,
                submitted: submitted_total,
            });
        }
        Ok(())
    }
}
