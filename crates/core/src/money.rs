//! Currency math on integer cents.
//!
//! All monetary amounts in the domain are carried as `u64` **cents**
//! (smallest currency unit); rates are `u32` **basis points** (150 = 1.50%).
//! Fractional intermediates are exact rationals over [`BPS_DENOM`] and are
//! rounded to whole cents with half-up semantics in a single place, so every
//! fee computation in the workspace rounds the same way.

/// Denominator for basis-point rates: 10_000 bps = 100%.
pub const BPS_DENOM: u64 = 10_000;

/// Round the rational `numer / denom` to the nearest integer, ties away
/// from zero (standard currency rounding).
///
/// `denom` must be positive. The numerator is signed: net-receivable math
/// can go negative when flat gateway fees exceed a tiny amount.
pub fn round_half_up(numer: i128, denom: u64) -> i64 {
    debug_assert!(denom > 0, "denominator must be positive");
    let d = denom as i128;
    if numer >= 0 {
        ((2 * numer + d) / (2 * d)) as i64
    } else {
        -(((2 * -numer + d) / (2 * d)) as i64)
    }
}

/// Apply a basis-point rate to an amount in cents, rounding half-up.
pub fn bps_of(amount: u64, bps: u32) -> u64 {
    round_half_up(amount as i128 * bps as i128, BPS_DENOM) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rounds_down_below_half() {
        // 15.015 -> 15
        assert_eq!(round_half_up(150_150, 10_000), 15);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_half_up(5, 10), 1);
        assert_eq!(round_half_up(-5, 10), -1);
        assert_eq!(round_half_up(15, 10), 2);
        assert_eq!(round_half_up(-15, 10), -2);
    }

    #[test]
    fn exact_values_are_untouched() {
        assert_eq!(round_half_up(300, 1), 300);
        assert_eq!(round_half_up(20_000 * 150, 10_000), 300);
    }

    #[test]
    fn bps_of_worked_examples() {
        // 1.5% of R$100.00
        assert_eq!(bps_of(10_000, 150), 150);
        // 4.99% of R$100.00
        assert_eq!(bps_of(10_000, 499), 499);
        assert_eq!(bps_of(0, 499), 0);
    }

    proptest! {
        /// Rounding error is strictly bounded by half a cent:
        /// |round(n/d) * d - n| <= d/2.
        #[test]
        fn rounding_error_is_at_most_half_denom(
            numer in -1_000_000_000_000i128..1_000_000_000_000i128,
            denom in 1u64..100_000u64,
        ) {
            let rounded = round_half_up(numer, denom) as i128;
            let err = (rounded * denom as i128 - numer).abs();
            prop_assert!(err * 2 <= denom as i128);
        }

        /// Applying an integral-percent rate to an exact multiple is exact.
        #[test]
        fn bps_of_exact_multiples(amount in 0u64..1_000_000_000u64) {
            // 100% and 0% are always exact.
            prop_assert_eq!(bps_of(amount, 10_000), amount);
            prop_assert_eq!(bps_of(amount, 0), 0);
        }
    }
}
