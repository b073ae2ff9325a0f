//! Subscription aggregate: a recurring billing schedule that determines
//! when new invoices must be generated.

mod billing_cycle;
mod subscription;

pub use billing_cycle::{BillingCycle, next_billing_date};
pub use subscription::{
    BillingCycleAdvanced, CreateSubscription, Subscription, SubscriptionAmountUpdated,
    SubscriptionCanceled, SubscriptionCreated, SubscriptionEvent, SubscriptionId,
    SubscriptionMarkedOverdue, SubscriptionPaused, SubscriptionProps, SubscriptionResumed,
    SubscriptionStatus,
};
