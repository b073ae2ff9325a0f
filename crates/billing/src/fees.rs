use serde::{Deserialize, Serialize};

use cobrado_core::money::{BPS_DENOM, bps_of, round_half_up};
use cobrado_core::{DomainError, DomainResult, ValueObject};

/// Default platform fee retained on every invoice: 1.50%.
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 150;

/// How a charge is collected from the end payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Pix,
    Boleto,
    CreditCard,
}

/// Gateway cost per payment method.
///
/// An explicitly injected value object: the calculator never reads ambient
/// configuration, which keeps fee computation pure and testable. Flat fees
/// are cents; the credit-card rate is basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat PIX fee in cents (gateways commonly waive it).
    pub pix_fee: u64,
    /// Flat boleto fee in cents.
    pub boleto_fee: u64,
    /// Credit-card rate in basis points of the charged amount.
    pub credit_card_bps: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            pix_fee: 0,
            boleto_fee: 349,
            credit_card_bps: 499,
        }
    }
}

impl ValueObject for FeeSchedule {}

/// Platform fee for an amount at a basis-point rate.
///
/// The single shared platform-fee primitive: tenant profiles and invoice
/// issuance both compute through here. Fails when `amount` is zero.
pub fn platform_fee(amount: u64, fee_bps: u32) -> DomainResult<u64> {
    if amount == 0 {
        return Err(DomainError::validation("amount must be positive"));
    }
    Ok(bps_of(amount, fee_bps))
}

/// Split of an invoice amount between platform, gateway, and tenant.
///
/// `tenant_receives` is signed: a flat gateway fee can exceed a tiny amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Percentage fee retained by the platform, in cents.
    pub platform_fee: u64,
    /// Cost charged by the external payment gateway, in cents.
    pub gateway_fee: u64,
    /// Net amount remaining for the tenant, in cents.
    pub tenant_receives: i64,
}

impl ValueObject for FeeBreakdown {}

impl FeeBreakdown {
    /// Compute the fee split for `amount` cents.
    ///
    /// `platform_fee` and `gateway_fee` are each rounded to whole cents
    /// independently; `tenant_receives` is computed from the *unrounded*
    /// rational intermediates and rounded once. The three parts therefore
    /// reconstruct `amount` only to within one cent — callers must compare
    /// with [`FeeBreakdown::total`] against that tolerance, never exactly.
    pub fn compute(
        amount: u64,
        platform_fee_bps: u32,
        method: PaymentMethod,
        schedule: &FeeSchedule,
    ) -> DomainResult<FeeBreakdown> {
        let platform = platform_fee(amount, platform_fee_bps)?;

        let gateway_fee = match method {
            PaymentMethod::Pix => schedule.pix_fee,
            PaymentMethod::Boleto => schedule.boleto_fee,
            PaymentMethod::CreditCard => bps_of(amount, schedule.credit_card_bps),
        };

        // Exact gateway cost as a rational over BPS_DENOM.
        let gateway_numer: i128 = match method {
            PaymentMethod::Pix => schedule.pix_fee as i128 * BPS_DENOM as i128,
            PaymentMethod::Boleto => schedule.boleto_fee as i128 * BPS_DENOM as i128,
            PaymentMethod::CreditCard => amount as i128 * schedule.credit_card_bps as i128,
        };

        let net_numer = amount as i128 * BPS_DENOM as i128
            - amount as i128 * platform_fee_bps as i128
            - gateway_numer;

        Ok(FeeBreakdown {
            platform_fee: platform,
            gateway_fee,
            tenant_receives: round_half_up(net_numer, BPS_DENOM),
        })
    }

    /// Sum of the three parts, for invariant checks against the amount.
    pub fn total(&self) -> i128 {
        self.platform_fee as i128 + self.gateway_fee as i128 + self.tenant_receives as i128
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pix_keeps_full_amount_minus_platform_fee() {
        let split = FeeBreakdown::compute(
            10_000,
            DEFAULT_PLATFORM_FEE_BPS,
            PaymentMethod::Pix,
            &FeeSchedule::default(),
        )
        .unwrap();

        assert_eq!(split.platform_fee, 150);
        assert_eq!(split.gateway_fee, 0);
        assert_eq!(split.tenant_receives, 9_850);
    }

    #[test]
    fn boleto_charges_a_flat_gateway_fee() {
        let split = FeeBreakdown::compute(
            20_000,
            DEFAULT_PLATFORM_FEE_BPS,
            PaymentMethod::Boleto,
            &FeeSchedule::default(),
        )
        .unwrap();

        assert_eq!(split.platform_fee, 300);
        assert_eq!(split.gateway_fee, 349);
        assert_eq!(split.tenant_receives, 19_351);
    }

    #[test]
    fn credit_card_charges_a_percentage_gateway_fee() {
        let split = FeeBreakdown::compute(
            10_000,
            DEFAULT_PLATFORM_FEE_BPS,
            PaymentMethod::CreditCard,
            &FeeSchedule::default(),
        )
        .unwrap();

        assert_eq!(split.platform_fee, 150);
        assert_eq!(split.gateway_fee, 499);
        assert_eq!(split.tenant_receives, 9_351);
    }

    #[test]
    fn zero_amount_is_rejected() {
        let err = FeeBreakdown::compute(
            0,
            DEFAULT_PLATFORM_FEE_BPS,
            PaymentMethod::Pix,
            &FeeSchedule::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn flat_fee_larger_than_amount_goes_negative() {
        // R$1.00 via boleto: the R$3.49 gateway fee swallows the amount.
        let split = FeeBreakdown::compute(
            100,
            DEFAULT_PLATFORM_FEE_BPS,
            PaymentMethod::Boleto,
            &FeeSchedule::default(),
        )
        .unwrap();

        assert_eq!(split.gateway_fee, 349);
        assert_eq!(split.tenant_receives, -251);
        assert_eq!(split.total(), 100);
    }

    #[test]
    fn independent_rounding_can_drift_one_cent_from_the_amount() {
        // 10 cents by card: every exact part rounds down, so the rounded
        // parts sum to 9 while the amount is 10. This is the documented
        // one-cent tolerance, not a bug.
        let split = FeeBreakdown::compute(
            10,
            DEFAULT_PLATFORM_FEE_BPS,
            PaymentMethod::CreditCard,
            &FeeSchedule::default(),
        )
        .unwrap();

        assert_eq!(split.platform_fee, 0);
        assert_eq!(split.gateway_fee, 0);
        assert_eq!(split.tenant_receives, 9);
        assert_eq!(split.total(), 9);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 512,
            ..ProptestConfig::default()
        })]

        /// Property: for any positive amount, platform rate, and method, the
        /// three independently rounded parts reconstruct the amount to
        /// within one cent.
        #[test]
        fn fee_parts_reconstruct_amount_within_one_cent(
            amount in 1u64..1_000_000_000u64,
            platform_bps in 0u32..2_000u32,
            method_ix in 0usize..3usize,
        ) {
            let method = [
                PaymentMethod::Pix,
                PaymentMethod::Boleto,
                PaymentMethod::CreditCard,
            ][method_ix];

            let split = FeeBreakdown::compute(
                amount,
                platform_bps,
                method,
                &FeeSchedule::default(),
            ).unwrap();

            let drift = (split.total() - amount as i128).abs();
            prop_assert!(drift <= 1, "drift {drift} for amount {amount}");
        }

        /// Property: the platform-fee primitive and the breakdown agree.
        #[test]
        fn breakdown_platform_fee_matches_primitive(
            amount in 1u64..1_000_000_000u64,
            platform_bps in 0u32..2_000u32,
        ) {
            let split = FeeBreakdown::compute(
                amount,
                platform_bps,
                PaymentMethod::Pix,
                &FeeSchedule::default(),
            ).unwrap();

            prop_assert_eq!(split.platform_fee, platform_fee(amount, platform_bps).unwrap());
        }
    }
}
