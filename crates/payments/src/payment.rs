use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cobrado_billing::PaymentMethod;
use cobrado_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_customers::CustomerId;
use cobrado_events::Event;
use cobrado_invoicing::InvoiceId;

/// Payment identifier (tenant-scoped via `tenant_id` on the aggregate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub AggregateId);

impl PaymentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Payment status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Allowed status transitions.
    ///
    /// Refunded is reachable only from Confirmed and is terminal: a
    /// confirmed payment can never retroactively fail, refunded or not.
    /// Failed -> Failed keeps `fail` tolerant of gateway retries.
    pub fn can_transition(self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed) | (Pending, Failed) | (Confirmed, Refunded) | (Failed, Failed)
        )
    }
}

/// Raw state of a payment.
///
/// Doubles as the trusted reconstitution input, the repository record, and
/// the transport projection (all public fields, verbatim).
///
/// `invoice_id`, `tenant_id` and `customer_id` are fixed at creation: no
/// mutator touches them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProps {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    /// Amount received, in cents.
    pub amount: u64,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub gateway_payment_id: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a new payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub invoice_id: InvoiceId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub amount: u64,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<DateTime<Utc>>,
    pub gateway_payment_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: Payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    props: PaymentProps,
}

impl Payment {
    /// Validating factory: rejects malformed input before any state exists.
    pub fn record(input: RecordPayment) -> DomainResult<(Self, PaymentEvent)> {
        if input.amount == 0 {
            return Err(DomainError::validation("amount must be positive"));
        }

        let id = PaymentId::new(AggregateId::new());
        let payment = Self {
            props: PaymentProps {
                id,
                invoice_id: input.invoice_id,
                tenant_id: input.tenant_id,
                customer_id: input.customer_id,
                amount: input.amount,
                payment_method: input.payment_method,
                status: PaymentStatus::Pending,
                payment_date: input.payment_date,
                confirmed_at: None,
                gateway_payment_id: input.gateway_payment_id,
                version: 1,
                created_at: input.occurred_at,
                updated_at: input.occurred_at,
            },
        };

        let event = PaymentEvent::PaymentRecorded(PaymentRecorded {
            tenant_id: input.tenant_id,
            payment_id: id,
            invoice_id: input.invoice_id,
            customer_id: input.customer_id,
            amount: input.amount,
            payment_method: input.payment_method,
            occurred_at: input.occurred_at,
        });

        Ok((payment, event))
    }

    /// Trusted-source path: rebuild from stored props, skipping validation.
    pub fn reconstitute(props: PaymentProps) -> Self {
        Self { props }
    }

    /// Confirm receipt of funds. Fails once the payment is Confirmed,
    /// Failed, or Refunded.
    pub fn confirm(&mut self, confirmed_at: DateTime<Utc>) -> DomainResult<PaymentEvent> {
        if !self.props.status.can_transition(PaymentStatus::Confirmed) {
            return Err(match self.props.status {
                PaymentStatus::Confirmed => DomainError::invariant("payment already confirmed"),
                PaymentStatus::Failed => {
                    DomainError::invariant("failed payment cannot be confirmed")
                }
                _ => DomainError::invariant("refunded payment cannot be confirmed"),
            });
        }

        self.props.status = PaymentStatus::Confirmed;
        self.props.confirmed_at = Some(confirmed_at);
        self.touch(confirmed_at);

        Ok(PaymentEvent::PaymentConfirmed(PaymentConfirmed {
            tenant_id: self.props.tenant_id,
            payment_id: self.props.id,
            invoice_id: self.props.invoice_id,
            amount: self.props.amount,
            confirmed_at,
            occurred_at: confirmed_at,
        }))
    }

    /// Mark the payment as failed. A confirmed payment can never
    /// retroactively fail.
    pub fn fail(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<PaymentEvent> {
        if !self.props.status.can_transition(PaymentStatus::Failed) {
            return Err(match self.props.status {
                PaymentStatus::Confirmed => {
                    DomainError::invariant("confirmed payment cannot fail")
                }
                _ => DomainError::invariant("refunded payment cannot fail"),
            });
        }

        self.props.status = PaymentStatus::Failed;
        self.touch(occurred_at);

        Ok(PaymentEvent::PaymentFailed(PaymentFailed {
            tenant_id: self.props.tenant_id,
            payment_id: self.props.id,
            invoice_id: self.props.invoice_id,
            occurred_at,
        }))
    }

    /// Return funds. Only a confirmed payment can be refunded.
    pub fn refund(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<PaymentEvent> {
        if !self.props.status.can_transition(PaymentStatus::Refunded) {
            return Err(DomainError::invariant(
                "only confirmed payments can be refunded",
            ));
        }

        self.props.status = PaymentStatus::Refunded;
        self.touch(occurred_at);

        Ok(PaymentEvent::PaymentRefunded(PaymentRefunded {
            tenant_id: self.props.tenant_id,
            payment_id: self.props.id,
            invoice_id: self.props.invoice_id,
            amount: self.props.amount,
            occurred_at,
        }))
    }

    /// Attach the external gateway reference. Side-effect only.
    pub fn link_gateway_payment(
        &mut self,
        gateway_payment_id: String,
        occurred_at: DateTime<Utc>,
    ) -> PaymentEvent {
        self.props.gateway_payment_id = Some(gateway_payment_id.clone());
        self.touch(occurred_at);

        PaymentEvent::GatewayPaymentLinked(GatewayPaymentLinked {
            tenant_id: self.props.tenant_id,
            payment_id: self.props.id,
            gateway_payment_id,
            occurred_at,
        })
    }

    pub fn is_confirmed(&self) -> bool {
        self.props.status == PaymentStatus::Confirmed
    }

    fn touch(&mut self, occurred_at: DateTime<Utc>) {
        self.props.updated_at = occurred_at;
        self.props.version += 1;
    }

    pub fn props(&self) -> &PaymentProps {
        &self.props
    }

    pub fn id_typed(&self) -> PaymentId {
        self.props.id
    }

    pub fn invoice_id(&self) -> InvoiceId {
        self.props.invoice_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.props.tenant_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.props.customer_id
    }

    pub fn amount(&self) -> u64 {
        self.props.amount
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.props.payment_method
    }

    pub fn status(&self) -> PaymentStatus {
        self.props.status
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.props.payment_date
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.props.confirmed_at
    }

    pub fn gateway_payment_id(&self) -> Option<&str> {
        self.props.gateway_payment_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.props.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.props.updated_at
    }
}

impl AggregateRoot for Payment {
    type Id = PaymentId;

    fn id(&self) -> &Self::Id {
        &self.props.id
    }

    fn version(&self) -> u64 {
        self.props.version
    }
}

/// Event: PaymentRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub amount: u64,
    pub payment_method: PaymentMethod,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmed {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: u64,
    pub confirmed_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailed {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentRefunded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRefunded {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub invoice_id: InvoiceId,
    pub amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GatewayPaymentLinked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayPaymentLinked {
    pub tenant_id: TenantId,
    pub payment_id: PaymentId,
    pub gateway_payment_id: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentEvent {
    PaymentRecorded(PaymentRecorded),
    PaymentConfirmed(PaymentConfirmed),
    PaymentFailed(PaymentFailed),
    PaymentRefunded(PaymentRefunded),
    GatewayPaymentLinked(GatewayPaymentLinked),
}

impl Event for PaymentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PaymentEvent::PaymentRecorded(_) => "payments.payment.recorded",
            PaymentEvent::PaymentConfirmed(_) => "payments.payment.confirmed",
            PaymentEvent::PaymentFailed(_) => "payments.payment.failed",
            PaymentEvent::PaymentRefunded(_) => "payments.payment.refunded",
            PaymentEvent::GatewayPaymentLinked(_) => "payments.payment.gateway_payment_linked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PaymentEvent::PaymentRecorded(e) => e.occurred_at,
            PaymentEvent::PaymentConfirmed(e) => e.occurred_at,
            PaymentEvent::PaymentFailed(e) => e.occurred_at,
            PaymentEvent::PaymentRefunded(e) => e.occurred_at,
            PaymentEvent::GatewayPaymentLinked(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn record_input() -> RecordPayment {
        RecordPayment {
            invoice_id: InvoiceId::new(AggregateId::new()),
            tenant_id: TenantId::new(),
            customer_id: CustomerId::new(AggregateId::new()),
            amount: 10_000,
            payment_method: PaymentMethod::Pix,
            payment_date: None,
            gateway_payment_id: None,
            occurred_at: test_time(),
        }
    }

    #[test]
    fn record_starts_pending() {
        let (payment, event) = Payment::record(record_input()).unwrap();

        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert!(!payment.is_confirmed());

        match event {
            PaymentEvent::PaymentRecorded(e) => {
                assert_eq!(e.payment_id, payment.id_typed());
                assert_eq!(e.amount, 10_000);
            }
            _ => panic!("Expected PaymentRecorded event"),
        }
    }

    #[test]
    fn record_rejects_zero_amount() {
        let mut input = record_input();
        input.amount = 0;
        assert!(matches!(
            Payment::record(input).unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn confirm_sets_confirmed_at_and_is_final() {
        let (mut payment, _) = Payment::record(record_input()).unwrap();
        let confirmed_at = test_time();

        payment.confirm(confirmed_at).unwrap();
        assert!(payment.is_confirmed());
        assert_eq!(payment.confirmed_at(), Some(confirmed_at));

        let err = payment.confirm(test_time()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn confirmed_payment_never_fails() {
        let (mut payment, _) = Payment::record(record_input()).unwrap();
        payment.confirm(test_time()).unwrap();

        let err = payment.fail(test_time()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(payment.status(), PaymentStatus::Confirmed);
    }

    #[test]
    fn failed_payment_cannot_be_confirmed() {
        let (mut payment, _) = Payment::record(record_input()).unwrap();
        payment.fail(test_time()).unwrap();

        let err = payment.confirm(test_time()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn refund_requires_confirmed() {
        let (mut payment, _) = Payment::record(record_input()).unwrap();

        let err = payment.refund(test_time()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        payment.confirm(test_time()).unwrap();
        payment.refund(test_time()).unwrap();
        assert_eq!(payment.status(), PaymentStatus::Refunded);
    }

    #[test]
    fn refunded_payment_is_terminal() {
        let (mut payment, _) = Payment::record(record_input()).unwrap();
        payment.confirm(test_time()).unwrap();
        payment.refund(test_time()).unwrap();

        assert!(payment.confirm(test_time()).is_err());
        assert!(payment.fail(test_time()).is_err());
        assert!(payment.refund(test_time()).is_err());
        assert_eq!(payment.status(), PaymentStatus::Refunded);
    }

    #[test]
    fn identity_fields_survive_every_mutation() {
        let input = record_input();
        let invoice_id = input.invoice_id;
        let tenant_id = input.tenant_id;
        let customer_id = input.customer_id;

        let (mut payment, _) = Payment::record(input).unwrap();
        payment.link_gateway_payment("pay_123".to_string(), test_time());
        payment.confirm(test_time()).unwrap();
        payment.refund(test_time()).unwrap();

        assert_eq!(payment.invoice_id(), invoice_id);
        assert_eq!(payment.tenant_id(), tenant_id);
        assert_eq!(payment.customer_id(), customer_id);
    }

    #[test]
    fn link_gateway_payment_attaches_reference() {
        let (mut payment, _) = Payment::record(record_input()).unwrap();
        payment.link_gateway_payment("pay_9".to_string(), test_time());
        assert_eq!(payment.gateway_payment_id(), Some("pay_9"));
        assert_eq!(payment.status(), PaymentStatus::Pending);
    }
}
