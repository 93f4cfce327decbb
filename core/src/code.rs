//! Human-readable reservation and booking codes.

use chrono::{DateTime, Utc};
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SUFFIX_LEN: usize = 6;

/// Prefix for reservation codes.
pub const RESERVATION_PREFIX: &str = "RES";
/// Prefix for booking codes.
pub const BOOKING_PREFIX: &str = "BKG";

/// Generates `PREFIX-YYMMDD-XXXXXX`, the suffix drawn from an alphabet
/// without look-alike characters (no `0/O`, `1/I`).
#[must_use]
pub fn generate(prefix: &str, now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect();
    format!("{prefix}-{}-{suffix}", now.format("%y%m%d"))
}
