use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cobrado_billing::PaymentMethod;
use cobrado_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_customers::CustomerId;
use cobrado_events::Event;

use crate::billing_cycle::{BillingCycle, next_billing_date};

/// Subscription identifier (tenant-scoped via `tenant_id` on the aggregate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub AggregateId);

impl SubscriptionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Subscription status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Canceled,
    Overdue,
}

impl SubscriptionStatus {
    /// Allowed status transitions.
    ///
    /// Canceled is terminal; the Canceled -> Canceled self-loop keeps
    /// `cancel` idempotent, and Paused -> Paused keeps `pause` tolerant of
    /// repeats. Overdue can only leave toward Paused or Canceled.
    pub fn can_transition(self, to: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, to),
            (Active, Paused)
                | (Active, Canceled)
                | (Active, Overdue)
                | (Paused, Active)
                | (Paused, Paused)
                | (Paused, Canceled)
                | (Overdue, Paused)
                | (Overdue, Canceled)
                | (Canceled, Canceled)
        )
    }
}

/// Raw state of a subscription.
///
/// Doubles as the trusted reconstitution input, the repository record, and
/// the transport projection (all public fields, verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionProps {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub description: Option<String>,
    /// Amount billed each cycle, in cents.
    pub amount: u64,
    pub billing_cycle: BillingCycle,
    pub payment_method: PaymentMethod,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
    pub last_billing_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscription {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub description: Option<String>,
    pub amount: u64,
    pub billing_cycle: BillingCycle,
    pub payment_method: PaymentMethod,
    pub start_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: Subscription.
///
/// `next_billing_date` is always the previous anchor advanced by exactly one
/// cycle increment; advancing never reads the clock, so the schedule cannot
/// drift against its original anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    props: SubscriptionProps,
}

impl Subscription {
    /// Validating factory: rejects malformed input before any state exists.
    pub fn create(input: CreateSubscription) -> DomainResult<(Self, SubscriptionEvent)> {
        if input.amount == 0 {
            return Err(DomainError::validation("amount must be positive"));
        }

        let first_billing = next_billing_date(input.start_date, input.billing_cycle)?;

        let id = SubscriptionId::new(AggregateId::new());
        let subscription = Self {
            props: SubscriptionProps {
                id,
                tenant_id: input.tenant_id,
                customer_id: input.customer_id,
                description: input.description,
                amount: input.amount,
                billing_cycle: input.billing_cycle,
                payment_method: input.payment_method,
                status: SubscriptionStatus::Active,
                start_date: input.start_date,
                next_billing_date: first_billing,
                last_billing_date: None,
                end_date: None,
                version: 1,
                created_at: input.occurred_at,
                updated_at: input.occurred_at,
            },
        };

        let event = SubscriptionEvent::SubscriptionCreated(SubscriptionCreated {
            tenant_id: input.tenant_id,
            subscription_id: id,
            customer_id: input.customer_id,
            amount: input.amount,
            billing_cycle: input.billing_cycle,
            next_billing_date: first_billing,
            occurred_at: input.occurred_at,
        });

        Ok((subscription, event))
    }

    /// Trusted-source path: rebuild from stored props, skipping validation.
    pub fn reconstitute(props: SubscriptionProps) -> Self {
        Self { props }
    }

    /// True when an invoice must be generated: active and due.
    ///
    /// Pure predicate; the external scheduler polls it and, when true,
    /// issues the invoice and then calls [`Subscription::advance_billing_cycle`].
    pub fn should_generate_invoice(&self, now: DateTime<Utc>) -> bool {
        self.props.status == SubscriptionStatus::Active && now >= self.props.next_billing_date
    }

    pub fn is_active(&self) -> bool {
        self.props.status == SubscriptionStatus::Active
    }

    /// Move the current anchor into `last_billing_date` and compute the new
    /// `next_billing_date` from it — never from "now".
    pub fn advance_billing_cycle(
        &mut self,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<SubscriptionEvent> {
        let previous = self.props.next_billing_date;
        let next = next_billing_date(previous, self.props.billing_cycle)?;

        self.props.last_billing_date = Some(previous);
        self.props.next_billing_date = next;
        self.touch(occurred_at);

        Ok(SubscriptionEvent::BillingCycleAdvanced(
            BillingCycleAdvanced {
                tenant_id: self.props.tenant_id,
                subscription_id: self.props.id,
                last_billing_date: previous,
                next_billing_date: next,
                occurred_at,
            },
        ))
    }

    pub fn pause(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<SubscriptionEvent> {
        self.ensure_transition(SubscriptionStatus::Paused)?;
        self.props.status = SubscriptionStatus::Paused;
        self.touch(occurred_at);

        Ok(SubscriptionEvent::SubscriptionPaused(SubscriptionPaused {
            tenant_id: self.props.tenant_id,
            subscription_id: self.props.id,
            occurred_at,
        }))
    }

    pub fn resume(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<SubscriptionEvent> {
        if self.props.status != SubscriptionStatus::Paused {
            return Err(DomainError::invariant(
                "only paused subscriptions can be resumed",
            ));
        }
        self.props.status = SubscriptionStatus::Active;
        self.touch(occurred_at);

        Ok(SubscriptionEvent::SubscriptionResumed(SubscriptionResumed {
            tenant_id: self.props.tenant_id,
            subscription_id: self.props.id,
            occurred_at,
        }))
    }

    /// Always allowed; terminal. Sets `end_date` to the cancellation time.
    pub fn cancel(&mut self, occurred_at: DateTime<Utc>) -> SubscriptionEvent {
        self.props.status = SubscriptionStatus::Canceled;
        self.props.end_date = Some(occurred_at);
        self.touch(occurred_at);

        SubscriptionEvent::SubscriptionCanceled(SubscriptionCanceled {
            tenant_id: self.props.tenant_id,
            subscription_id: self.props.id,
            end_date: occurred_at,
            occurred_at,
        })
    }

    /// Acts only from Active; a no-op (no event, no timestamp change)
    /// in every other status.
    pub fn mark_as_overdue(&mut self, occurred_at: DateTime<Utc>) -> Option<SubscriptionEvent> {
        if !self.props.status.can_transition(SubscriptionStatus::Overdue) {
            return None;
        }
        self.props.status = SubscriptionStatus::Overdue;
        self.touch(occurred_at);

        Some(SubscriptionEvent::SubscriptionMarkedOverdue(
            SubscriptionMarkedOverdue {
                tenant_id: self.props.tenant_id,
                subscription_id: self.props.id,
                occurred_at,
            },
        ))
    }

    pub fn update_amount(
        &mut self,
        new_amount: u64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<SubscriptionEvent> {
        if new_amount == 0 {
            return Err(DomainError::validation("amount must be positive"));
        }
        self.props.amount = new_amount;
        self.touch(occurred_at);

        Ok(SubscriptionEvent::SubscriptionAmountUpdated(
            SubscriptionAmountUpdated {
                tenant_id: self.props.tenant_id,
                subscription_id: self.props.id,
                amount: new_amount,
                occurred_at,
            },
        ))
    }

    fn ensure_transition(&self, to: SubscriptionStatus) -> DomainResult<()> {
        if self.props.status.can_transition(to) {
            Ok(())
        } else {
            Err(DomainError::invariant(format!(
                "illegal subscription transition: {:?} -> {to:?}",
                self.props.status
            )))
        }
    }

    fn touch(&mut self, occurred_at: DateTime<Utc>) {
        self.props.updated_at = occurred_at;
        self.props.version += 1;
    }

    pub fn props(&self) -> &SubscriptionProps {
        &self.props
    }

    pub fn id_typed(&self) -> SubscriptionId {
        self.props.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.props.tenant_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.props.customer_id
    }

    pub fn description(&self) -> Option<&str> {
        self.props.description.as_deref()
    }

    pub fn amount(&self) -> u64 {
        self.props.amount
    }

    pub fn billing_cycle(&self) -> BillingCycle {
        self.props.billing_cycle
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.props.payment_method
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.props.status
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.props.start_date
    }

    pub fn next_billing_date(&self) -> DateTime<Utc> {
        self.props.next_billing_date
    }

    pub fn last_billing_date(&self) -> Option<DateTime<Utc>> {
        self.props.last_billing_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.props.end_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.props.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.props.updated_at
    }
}

impl AggregateRoot for Subscription {
    type Id = SubscriptionId;

    fn id(&self) -> &Self::Id {
        &self.props.id
    }

    fn version(&self) -> u64 {
        self.props.version
    }
}

/// Event: SubscriptionCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCreated {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub customer_id: CustomerId,
    pub amount: u64,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BillingCycleAdvanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCycleAdvanced {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub last_billing_date: DateTime<Utc>,
    pub next_billing_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionPaused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPaused {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionResumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResumed {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionCanceled {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub end_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionMarkedOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMarkedOverdue {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubscriptionAmountUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionAmountUpdated {
    pub tenant_id: TenantId,
    pub subscription_id: SubscriptionId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    SubscriptionCreated(SubscriptionCreated),
    BillingCycleAdvanced(BillingCycleAdvanced),
    SubscriptionPaused(SubscriptionPaused),
    SubscriptionResumed(SubscriptionResumed),
    SubscriptionCanceled(SubscriptionCanceled),
    SubscriptionMarkedOverdue(SubscriptionMarkedOverdue),
    SubscriptionAmountUpdated(SubscriptionAmountUpdated),
}

impl Event for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::SubscriptionCreated(_) => "subscriptions.subscription.created",
            SubscriptionEvent::BillingCycleAdvanced(_) => {
                "subscriptions.subscription.billing_cycle_advanced"
            }
            SubscriptionEvent::SubscriptionPaused(_) => "subscriptions.subscription.paused",
            SubscriptionEvent::SubscriptionResumed(_) => "subscriptions.subscription.resumed",
            SubscriptionEvent::SubscriptionCanceled(_) => "subscriptions.subscription.canceled",
            SubscriptionEvent::SubscriptionMarkedOverdue(_) => {
                "subscriptions.subscription.marked_overdue"
            }
            SubscriptionEvent::SubscriptionAmountUpdated(_) => {
                "subscriptions.subscription.amount_updated"
            }
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SubscriptionEvent::SubscriptionCreated(e) => e.occurred_at,
            SubscriptionEvent::BillingCycleAdvanced(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionPaused(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionResumed(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionCanceled(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionMarkedOverdue(e) => e.occurred_at,
            SubscriptionEvent::SubscriptionAmountUpdated(e) => e.occurred_at,
        }
    }
}
