use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cobrado_billing::{FeeBreakdown, FeeSchedule, PaymentMethod};
use cobrado_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_customers::CustomerId;
use cobrado_events::Event;
use cobrado_subscriptions::SubscriptionId;

/// Invoice identifier (tenant-scoped via `tenant_id` on the aggregate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Canceled,
}

impl InvoiceStatus {
    /// Allowed status transitions.
    ///
    /// Paid is terminal. Overdue is reversible back to Paid (a late payment
    /// still settles the invoice). Canceled -> Canceled keeps `cancel`
    /// idempotent.
    pub fn can_transition(self, to: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, to),
            (Pending, Paid)
                | (Pending, Overdue)
                | (Pending, Canceled)
                | (Overdue, Paid)
                | (Overdue, Canceled)
                | (Canceled, Canceled)
        )
    }
}

/// Raw state of an invoice.
///
/// Doubles as the trusted reconstitution input, the repository record, and
/// the transport projection (all public fields, verbatim) consumed by the
/// external HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceProps {
    pub id: InvoiceId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub subscription_id: Option<SubscriptionId>,
    pub invoice_number: String,
    /// Charged amount, in cents.
    pub amount: u64,
    /// Platform share, in cents.
    pub platform_fee: u64,
    /// Gateway cost, in cents.
    pub gateway_fee: u64,
    /// Net tenant receivable, in cents (signed: flat fees can exceed tiny
    /// amounts).
    pub tenant_receives: i64,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    pub payment_link: Option<String>,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub gateway_charge_id: Option<String>,
    pub paid_date: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for issuing a new invoice.
///
/// `platform_fee_bps` comes from the owning tenant; `fee_schedule` is the
/// injected gateway cost table. The fee breakdown is computed here, at
/// issue time, and frozen into the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueInvoice {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub subscription_id: Option<SubscriptionId>,
    pub invoice_number: String,
    pub amount: u64,
    pub due_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub platform_fee_bps: u32,
    pub fee_schedule: FeeSchedule,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: Invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    props: InvoiceProps,
}

impl Invoice {
    /// Validating factory: rejects malformed input before any state exists.
    ///
    /// Fails when the amount is zero, the due date is not strictly in the
    /// future relative to `occurred_at`, or the invoice number is empty.
    pub fn issue(input: IssueInvoice) -> DomainResult<(Self, InvoiceEvent)> {
        if input.due_date <= input.occurred_at {
            return Err(DomainError::validation("due date must be in the future"));
        }
        if input.invoice_number.trim().is_empty() {
            return Err(DomainError::validation("invoice number is required"));
        }

        // Rejects amount == 0 and splits the amount between platform,
        // gateway, and tenant.
        let fees = FeeBreakdown::compute(
            input.amount,
            input.platform_fee_bps,
            input.payment_method,
            &input.fee_schedule,
        )?;
        debug_assert!((fees.total() - input.amount as i128).abs() <= 1);

        let id = InvoiceId::new(AggregateId::new());
        let invoice = Self {
            props: InvoiceProps {
                id,
                tenant_id: input.tenant_id,
                customer_id: input.customer_id,
                subscription_id: input.subscription_id,
                invoice_number: input.invoice_number.clone(),
                amount: input.amount,
                platform_fee: fees.platform_fee,
                gateway_fee: fees.gateway_fee,
                tenant_receives: fees.tenant_receives,
                due_date: input.due_date,
                status: InvoiceStatus::Pending,
                payment_link: None,
                pix_qr_code: None,
                pix_copy_paste: None,
                gateway_charge_id: None,
                paid_date: None,
                version: 1,
                created_at: input.occurred_at,
                updated_at: input.occurred_at,
            },
        };

        let event = InvoiceEvent::InvoiceIssued(InvoiceIssued {
            tenant_id: input.tenant_id,
            invoice_id: id,
            customer_id: input.customer_id,
            subscription_id: input.subscription_id,
            invoice_number: input.invoice_number,
            amount: input.amount,
            platform_fee: fees.platform_fee,
            gateway_fee: fees.gateway_fee,
            tenant_receives: fees.tenant_receives,
            due_date: input.due_date,
            occurred_at: input.occurred_at,
        });

        Ok((invoice, event))
    }

    /// Trusted-source path: rebuild from stored props, skipping validation.
    pub fn reconstitute(props: InvoiceProps) -> Self {
        Self { props }
    }

    /// Settle the invoice. Allowed from Pending or Overdue; a paid invoice
    /// never un-pays and a canceled invoice cannot be settled.
    pub fn mark_as_paid(&mut self, paid_date: DateTime<Utc>) -> DomainResult<InvoiceEvent> {
        if !self.props.status.can_transition(InvoiceStatus::Paid) {
            return Err(match self.props.status {
                InvoiceStatus::Paid => DomainError::invariant("invoice already paid"),
                _ => DomainError::invariant("canceled invoice cannot be paid"),
            });
        }

        self.props.status = InvoiceStatus::Paid;
        self.props.paid_date = Some(paid_date);
        self.touch(paid_date);

        Ok(InvoiceEvent::InvoicePaid(InvoicePaid {
            tenant_id: self.props.tenant_id,
            invoice_id: self.props.id,
            paid_date,
            occurred_at: paid_date,
        }))
    }

    /// Flag a pending invoice past its due date. A no-op (no event, no
    /// timestamp change) in every other status; the caller — an external
    /// scheduler — invokes this once `now > due_date`.
    pub fn mark_as_overdue(&mut self, occurred_at: DateTime<Utc>) -> Option<InvoiceEvent> {
        if self.props.status != InvoiceStatus::Pending {
            return None;
        }

        self.props.status = InvoiceStatus::Overdue;
        self.touch(occurred_at);

        Some(InvoiceEvent::InvoiceMarkedOverdue(InvoiceMarkedOverdue {
            tenant_id: self.props.tenant_id,
            invoice_id: self.props.id,
            occurred_at,
        }))
    }

    /// Cancel the invoice. Allowed from any status except Paid.
    pub fn cancel(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<InvoiceEvent> {
        if !self.props.status.can_transition(InvoiceStatus::Canceled) {
            return Err(DomainError::invariant("paid invoice cannot be canceled"));
        }

        self.props.status = InvoiceStatus::Canceled;
        self.touch(occurred_at);

        Ok(InvoiceEvent::InvoiceCanceled(InvoiceCanceled {
            tenant_id: self.props.tenant_id,
            invoice_id: self.props.id,
            occurred_at,
        }))
    }

    /// Attach external gateway references. Side-effect only: no state
    /// transition.
    pub fn link_gateway_charge(
        &mut self,
        charge_id: String,
        payment_link: String,
        pix_qr_code: Option<String>,
        pix_copy_paste: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> InvoiceEvent {
        self.props.gateway_charge_id = Some(charge_id.clone());
        self.props.payment_link = Some(payment_link.clone());
        self.props.pix_qr_code = pix_qr_code;
        self.props.pix_copy_paste = pix_copy_paste;
        self.touch(occurred_at);

        InvoiceEvent::GatewayChargeLinked(GatewayChargeLinked {
            tenant_id: self.props.tenant_id,
            invoice_id: self.props.id,
            gateway_charge_id: charge_id,
            payment_link,
            occurred_at,
        })
    }

    /// Derived predicate: pending and past due. Does not mutate — distinct
    /// from [`Invoice::mark_as_overdue`].
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.props.status == InvoiceStatus::Pending && now > self.props.due_date
    }

    pub fn is_paid(&self) -> bool {
        self.props.status == InvoiceStatus::Paid
    }

    fn touch(&mut self, occurred_at: DateTime<Utc>) {
        self.props.updated_at = occurred_at;
        self.props.version += 1;
    }

    pub fn props(&self) -> &InvoiceProps {
        &self.props
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.props.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.props.tenant_id
    }

    pub fn customer_id(&self) -> CustomerId {
        self.props.customer_id
    }

    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.props.subscription_id
    }

    pub fn invoice_number(&self) -> &str {
        &self.props.invoice_number
    }

    pub fn amount(&self) -> u64 {
        self.props.amount
    }

    pub fn platform_fee(&self) -> u64 {
        self.props.platform_fee
    }

    pub fn gateway_fee(&self) -> u64 {
        self.props.gateway_fee
    }

    pub fn tenant_receives(&self) -> i64 {
        self.props.tenant_receives
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.props.due_date
    }

    pub fn status(&self) -> InvoiceStatus {
        self.props.status
    }

    pub fn payment_link(&self) -> Option<&str> {
        self.props.payment_link.as_deref()
    }

    pub fn pix_qr_code(&self) -> Option<&str> {
        self.props.pix_qr_code.as_deref()
    }

    pub fn pix_copy_paste(&self) -> Option<&str> {
        self.props.pix_copy_paste.as_deref()
    }

    pub fn gateway_charge_id(&self) -> Option<&str> {
        self.props.gateway_charge_id.as_deref()
    }

    pub fn paid_date(&self) -> Option<DateTime<Utc>> {
        self.props.paid_date
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.props.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.props.updated_at
    }
}

impl AggregateRoot for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.props.id
    }

    fn version(&self) -> u64 {
        self.props.version
    }
}

/// Event: InvoiceIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceIssued {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub subscription_id: Option<SubscriptionId>,
    pub invoice_number: String,
    pub amount: u64,
    pub platform_fee: u64,
    pub gateway_fee: u64,
    pub tenant_receives: i64,
    pub due_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoicePaid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub paid_date: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceMarkedOverdue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceMarkedOverdue {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: InvoiceCanceled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCanceled {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GatewayChargeLinked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayChargeLinked {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub gateway_charge_id: String,
    pub payment_link: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceEvent {
    InvoiceIssued(InvoiceIssued),
    InvoicePaid(InvoicePaid),
    InvoiceMarkedOverdue(InvoiceMarkedOverdue),
    InvoiceCanceled(InvoiceCanceled),
    GatewayChargeLinked(GatewayChargeLinked),
}

impl Event for InvoiceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InvoiceEvent::InvoiceIssued(_) => "invoicing.invoice.issued",
            InvoiceEvent::InvoicePaid(_) => "invoicing.invoice.paid",
            InvoiceEvent::InvoiceMarkedOverdue(_) => "invoicing.invoice.marked_overdue",
            InvoiceEvent::InvoiceCanceled(_) => "invoicing.invoice.canceled",
            InvoiceEvent::GatewayChargeLinked(_) => "invoicing.invoice.gateway_charge_linked",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InvoiceEvent::InvoiceIssued(e) => e.occurred_at,
            InvoiceEvent::InvoicePaid(e) => e.occurred_at,
            InvoiceEvent::InvoiceMarkedOverdue(e) => e.occurred_at,
            InvoiceEvent::InvoiceCanceled(e) => e.occurred_at,
            InvoiceEvent::GatewayChargeLinked(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_customer_id() -> CustomerId {
        CustomerId::new(AggregateId::new())
    }

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn issue_input(amount: u64, method: PaymentMethod) -> IssueInvoice {
        let issued_at = date(2024, 3, 1);
        IssueInvoice {
            tenant_id: test_tenant_id(),
            customer_id: test_customer_id(),
            subscription_id: None,
            invoice_number: "INV-0001".to_string(),
            amount,
            due_date: issued_at + Duration::days(7),
            payment_method: method,
            platform_fee_bps: 150,
            fee_schedule: FeeSchedule::default(),
            occurred_at: issued_at,
        }
    }

    #[test]
    fn issue_freezes_the_fee_breakdown() {
        let (invoice, event) = Invoice::issue(issue_input(10_000, PaymentMethod::Pix)).unwrap();

        assert_eq!(invoice.status(), InvoiceStatus::Pending);
        assert_eq!(invoice.platform_fee(), 150);
        assert_eq!(invoice.gateway_fee(), 0);
        assert_eq!(invoice.tenant_receives(), 9_850);

        match event {
            InvoiceEvent::InvoiceIssued(e) => {
                assert_eq!(e.invoice_id, invoice.id_typed());
                assert_eq!(e.amount, 10_000);
                assert_eq!(e.platform_fee, 150);
            }
            _ => panic!("Expected InvoiceIssued event"),
        }
    }

    #[test]
    fn issue_rejects_zero_amount() {
        let err = Invoice::issue(issue_input(0, PaymentMethod::Pix)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn issue_rejects_due_date_not_in_the_future() {
        let mut input = issue_input(10_000, PaymentMethod::Pix);
        input.due_date = input.occurred_at;
        assert!(matches!(
            Invoice::issue(input).unwrap_err(),
            DomainError::Validation(_)
        ));

        let mut input = issue_input(10_000, PaymentMethod::Pix);
        input.due_date = input.occurred_at - Duration::days(1);
        assert!(matches!(
            Invoice::issue(input).unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn issue_rejects_blank_invoice_number() {
        let mut input = issue_input(10_000, PaymentMethod::Pix);
        input.invoice_number = "   ".to_string();
        assert!(matches!(
            Invoice::issue(input).unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[test]
    fn paid_invoice_never_transitions_again() {
        let (mut invoice, _) = Invoice::issue(issue_input(10_000, PaymentMethod::Pix)).unwrap();

        invoice.mark_as_paid(date(2024, 3, 2)).unwrap();
        assert!(invoice.is_paid());
        assert_eq!(invoice.paid_date(), Some(date(2024, 3, 2)));

        let err = invoice.mark_as_paid(date(2024, 3, 3)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let err = invoice.cancel(date(2024, 3, 3)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        assert!(invoice.mark_as_overdue(date(2024, 3, 3)).is_none());
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
    }

    #[test]
    fn canceled_invoice_cannot_be_paid() {
        let (mut invoice, _) = Invoice::issue(issue_input(10_000, PaymentMethod::Pix)).unwrap();

        invoice.cancel(date(2024, 3, 2)).unwrap();
        let err = invoice.mark_as_paid(date(2024, 3, 3)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn mark_as_overdue_only_acts_on_pending() {
        let (mut invoice, _) = Invoice::issue(issue_input(10_000, PaymentMethod::Pix)).unwrap();

        assert!(invoice.mark_as_overdue(date(2024, 3, 9)).is_some());
        assert_eq!(invoice.status(), InvoiceStatus::Overdue);

        // Second call is a no-op: no event, timestamp untouched.
        let before = invoice.updated_at();
        assert!(invoice.mark_as_overdue(date(2024, 3, 10)).is_none());
        assert_eq!(invoice.updated_at(), before);
    }

    #[test]
    fn overdue_invoice_can_still_be_paid() {
        let (mut invoice, _) = Invoice::issue(issue_input(10_000, PaymentMethod::Pix)).unwrap();

        invoice.mark_as_overdue(date(2024, 3, 9)).unwrap();
        invoice.mark_as_paid(date(2024, 3, 10)).unwrap();
        assert!(invoice.is_paid());
    }

    #[test]
    fn is_overdue_is_a_pure_predicate() {
        let (invoice, _) = Invoice::issue(issue_input(10_000, PaymentMethod::Pix)).unwrap();

        assert!(!invoice.is_overdue(invoice.due_date()));
        assert!(invoice.is_overdue(invoice.due_date() + Duration::seconds(1)));
        // Predicate did not mutate status.
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
    }

    #[test]
    fn link_gateway_charge_attaches_references_without_transition() {
        let (mut invoice, _) = Invoice::issue(issue_input(10_000, PaymentMethod::Pix)).unwrap();

        invoice.link_gateway_charge(
            "ch_123".to_string(),
            "https://pay.example/ch_123".to_string(),
            Some("qr-data".to_string()),
            Some("copy-paste-data".to_string()),
            date(2024, 3, 2),
        );

        assert_eq!(invoice.gateway_charge_id(), Some("ch_123"));
        assert_eq!(invoice.payment_link(), Some("https://pay.example/ch_123"));
        assert_eq!(invoice.pix_qr_code(), Some("qr-data"));
        assert_eq!(invoice.status(), InvoiceStatus::Pending);
    }

    #[test]
    fn props_serialize_every_public_field() {
        let (invoice, _) = Invoice::issue(issue_input(20_000, PaymentMethod::Boleto)).unwrap();

        let json = serde_json::to_value(invoice.props()).unwrap();
        for key in [
            "id",
            "tenant_id",
            "customer_id",
            "subscription_id",
            "invoice_number",
            "amount",
            "platform_fee",
            "gateway_fee",
            "tenant_receives",
            "due_date",
            "status",
            "payment_link",
            "pix_qr_code",
            "pix_copy_paste",
            "gateway_charge_id",
            "paid_date",
            "created_at",
            "updated_at",
        ] {
            assert!(json.get(key).is_some(), "missing field {key}");
        }
        assert_eq!(json["platform_fee"], 300);
        assert_eq!(json["gateway_fee"], 349);
        assert_eq!(json["tenant_receives"], 19_351);
    }

    proptest! {
        /// Property: the frozen fee parts always reconstruct the invoice
        /// amount to within one cent.
        #[test]
        fn issued_fee_parts_reconstruct_amount(
            amount in 1u64..100_000_000u64,
            method_ix in 0usize..3usize,
        ) {
            let method = [
                PaymentMethod::Pix,
                PaymentMethod::Boleto,
                PaymentMethod::CreditCard,
            ][method_ix];

            let (invoice, _) = Invoice::issue(issue_input(amount, method)).unwrap();
            let total = invoice.platform_fee() as i128
                + invoice.gateway_fee() as i128
                + invoice.tenant_receives() as i128;
            prop_assert!((total - amount as i128).abs() <= 1);
        }
    }
}
