use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use cobrado_core::{DomainError, DomainResult};

/// Recurrence interval governing when a subscription bills next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Annual,
}

/// Advance `current` by exactly one billing-cycle increment.
///
/// Day-based cycles add exact 7/14-day deltas. Calendar cycles use chrono's
/// month arithmetic, which clamps to the last valid day of the target month:
/// Jan 31 + 1 month lands on Feb 29 (leap) or Feb 28.
pub fn next_billing_date(
    current: DateTime<Utc>,
    cycle: BillingCycle,
) -> DomainResult<DateTime<Utc>> {
    let next = match cycle {
        BillingCycle::Weekly => current.checked_add_signed(Duration::days(7)),
        BillingCycle::Biweekly => current.checked_add_signed(Duration::days(14)),
        BillingCycle::Monthly => current.checked_add_months(Months::new(1)),
        BillingCycle::Quarterly => current.checked_add_months(Months::new(3)),
        BillingCycle::Annual => current.checked_add_months(Months::new(12)),
    };

    next.ok_or_else(|| DomainError::invariant("billing date out of representable range"))
}
