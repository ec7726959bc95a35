//! Order-preserving value-slot encodings.
//!
//! Sortable and range-filterable fields (numeric and date kinds) live in
//! per-document value slots. The engine compares slot values as unsigned
//! 64-bit integers, so every encoding here maps its domain into `u64` such
//! that the numeric order of the encoded form equals the natural order of
//! the source values.
//!
//! - Numerics are treated as doubles and mapped through the monotone
//!   IEEE-754 bit trick: flip all bits of negatives, set the sign bit of
//!   non-negatives. Integers ride along as doubles, so magnitudes beyond
//!   2^53 lose precision.
//! - Dates encode as zero-padded `YYYYMMDDHHMMSS` decimal numerals, which
//!   sort chronologically. Years 1–9999 are representable; the sentinels
//!   [`DATE_SLOT_MIN`] and [`DATE_SLOT_MAX`] stand in for open bounds.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldValue};

/// Encoded form of `0001-01-01 00:00:00`, the smallest representable date.
pub const DATE_SLOT_MIN: u64 = 10_101_000_000;

/// Encoded form of `9999-12-31 23:59:59`, the largest representable date.
pub const DATE_SLOT_MAX: u64 = 99_991_231_235_959;

/// Encode a double into the order-preserving `u64` domain.
pub fn encode_f64(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits >> 63 == 1 {
        // Negative: flip everything so more-negative sorts lower.
        !bits
    } else {
        // Non-negative: set the sign bit so positives sort above negatives.
        bits | (1 << 63)
    }
}

/// Invert [`encode_f64`].
pub fn decode_f64(encoded: u64) -> f64 {
    let bits = if encoded >> 63 == 1 {
        encoded & !(1 << 63)
    } else {
        !encoded
    };
    f64::from_bits(bits)
}

/// Encode a UTC datetime as a `YYYYMMDDHHMMSS` numeral.
///
/// # Errors
///
/// Fails for years outside 1–9999.
pub fn encode_date(value: &DateTime<Utc>) -> Result<u64> {
    let year = value.year();
    if !(1..=9999).contains(&year) {
        return Err(Error::invalid_range(
            "date",
            format!("year {year} outside the representable range 1-9999"),
        ));
    }
    Ok(year as u64 * 10_000_000_000
        + value.month() as u64 * 100_000_000
        + value.day() as u64 * 1_000_000
        + value.hour() as u64 * 10_000
        + value.minute() as u64 * 100
        + value.second() as u64)
}

/// Invert [`encode_date`]. Returns `None` for numerals that don't decode to
/// a valid calendar datetime.
pub fn decode_date(encoded: u64) -> Option<DateTime<Utc>> {
    let second = (encoded % 100) as u32;
    let minute = ((encoded / 100) % 100) as u32;
    let hour = ((encoded / 10_000) % 100) as u32;
    let day = ((encoded / 1_000_000) % 100) as u32;
    let month = ((encoded / 100_000_000) % 100) as u32;
    let year = (encoded / 10_000_000_000) as i32;

    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
}

/// Encode a validated field value into its slot representation.
///
/// # Errors
///
/// Fails when the value does not belong in a slot of the given kind, with
/// the field name carried for context.
pub fn slot_value(field: &str, kind: FieldKind, value: &FieldValue) -> Result<u64> {
    match (kind, value) {
        (FieldKind::Numeric, FieldValue::Integer(i)) => Ok(encode_f64(*i as f64)),
        (FieldKind::Numeric, FieldValue::Float(f)) if f.is_finite() => Ok(encode_f64(*f)),
        (FieldKind::Numeric, FieldValue::Float(_)) => Err(Error::invalid_range(
            field,
            "non-finite float has no slot encoding",
        )),
        (FieldKind::Date, FieldValue::Date(d)) => encode_date(d).map_err(|_| {
            Error::invalid_range(field, "date outside the representable year range")
        }),
        (kind, value) => Err(Error::invalid_range(
            field,
            format!(
                "{} value has no slot encoding for a {} field",
                value.variant_name(),
                kind.name()
            ),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ------------------------------------------------------------------------
    // Double encoding
    // ------------------------------------------------------------------------

    #[test]
    fn test_encode_f64_orders_signs() {
        assert!(encode_f64(-10.0) < encode_f64(-1.0));
        assert!(encode_f64(-1.0) < encode_f64(0.0));
        assert!(encode_f64(0.0) < encode_f64(1.0));
        assert!(encode_f64(1.0) < encode_f64(10.0));
    }

    #[test]
    fn test_encode_f64_round_trip() {
        for v in [-1e300, -3.5, -0.0, 0.0, 2.25, 1e18] {
            assert_eq!(decode_f64(encode_f64(v)), v);
        }
    }

    #[test]
    fn test_encode_f64_integer_ride_along() {
        assert!(encode_f64(10.0) < encode_f64(15.0));
        assert_eq!(decode_f64(encode_f64(42.0)), 42.0);
    }

    fn finite_f64() -> impl Strategy<Value = f64> {
        use proptest::num::f64::{NEGATIVE, NORMAL, POSITIVE, ZERO};
        POSITIVE | NEGATIVE | NORMAL | ZERO
    }

    proptest! {
        #[test]
        fn prop_encode_f64_preserves_order(a in finite_f64(), b in finite_f64()) {
            prop_assume!(a != b);
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            prop_assert!(encode_f64(lo) < encode_f64(hi));
        }

        #[test]
        fn prop_encode_f64_round_trips(v in finite_f64()) {
            prop_assert_eq!(decode_f64(encode_f64(v)), v);
        }
    }

    // ------------------------------------------------------------------------
    // Date encoding
    // ------------------------------------------------------------------------

    #[test]
    fn test_encode_date_layout() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        assert_eq!(encode_date(&date).unwrap(), 20_240_501_123_045);
    }

    #[test]
    fn test_encode_date_orders_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(encode_date(&earlier).unwrap() < encode_date(&later).unwrap());
    }

    #[test]
    fn test_date_round_trip() {
        let date = Utc.with_ymd_and_hms(1999, 2, 28, 6, 7, 8).unwrap();
        let encoded = encode_date(&date).unwrap();
        assert_eq!(decode_date(encoded), Some(date));
    }

    #[test]
    fn test_date_sentinels_bound_the_domain() {
        let min = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
        let max = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(encode_date(&min).unwrap(), DATE_SLOT_MIN);
        assert_eq!(encode_date(&max).unwrap(), DATE_SLOT_MAX);
    }

    #[test]
    fn test_decode_date_rejects_bad_numerals() {
        // Month 13 is not a date.
        assert_eq!(decode_date(20_241_301_000_000), None);
    }

    proptest! {
        #[test]
        fn prop_date_round_trips(
            year in 1i32..=9999,
            month in 1u32..=12,
            day in 1u32..=28,
            hour in 0u32..=23,
            minute in 0u32..=59,
            second in 0u32..=59,
        ) {
            let date = Utc.with_ymd_and_hms(year, month, day, hour, minute, second).unwrap();
            let encoded = encode_date(&date).unwrap();
            prop_assert_eq!(decode_date(encoded), Some(date));
        }
    }

    // ------------------------------------------------------------------------
    // Slot dispatch
    // ------------------------------------------------------------------------

    #[test]
    fn test_slot_value_numeric() {
        let v = slot_value("price", FieldKind::Numeric, &FieldValue::Integer(10)).unwrap();
        let w = slot_value("price", FieldKind::Numeric, &FieldValue::Float(15.0)).unwrap();
        assert!(v < w);
    }

    #[test]
    fn test_slot_value_date() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let v = slot_value("published", FieldKind::Date, &FieldValue::Date(date)).unwrap();
        assert_eq!(v, 20_240_501_000_000);
    }

    #[test]
    fn test_slot_value_rejects_kind_mismatch() {
        let err = slot_value("price", FieldKind::Numeric, &FieldValue::Text("10".into()));
        assert!(matches!(err, Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn test_slot_value_rejects_nan() {
        let err = slot_value("price", FieldKind::Numeric, &FieldValue::Float(f64::NAN));
        assert!(err.is_err());
    }
}
