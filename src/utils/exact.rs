//! Bit-exact hashing helpers for floating-point columns.
//!
//! Natural keys and whole-row comparisons use exact equality, so floats are
//! compared through their bit patterns. `-0.0` folds onto `0.0` and every NaN
//! folds onto one canonical NaN, which keeps `Eq` and `Hash` consistent.

const CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;
const ABSENT: u64 = 0xfff8_dead_0000_0001;

/// Bit pattern of `value` suitable for `Eq`/`Hash` keys
pub fn f64_bits(value: f64) -> u64 {
    if value.is_nan() {
        CANONICAL_NAN
    } else if value == 0.0 {
        0
    } else {
        value.to_bits()
    }
}

/// Bit pattern of an optional value; absent values compare equal to each other
pub fn opt_f64_bits(value: Option<f64>) -> u64 {
    value.map_or(ABSENT, f64_bits)
}
