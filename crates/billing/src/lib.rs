//! `cobrado-billing` — shared billing vocabulary.
//!
//! Payment methods, the injected gateway fee schedule, and the pure fee
//! calculator that splits an invoice amount between the platform, the
//! payment gateway, and the tenant's net receivable.

pub mod fees;

pub use fees::{
    DEFAULT_PLATFORM_FEE_BPS, FeeBreakdown, FeeSchedule, PaymentMethod, platform_fee,
};
