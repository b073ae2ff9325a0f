use std::sync::Arc;

use chrono::{DateTime, Utc};

use cobrado_billing::PaymentMethod;
use cobrado_core::{AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_customers::CustomerId;
use cobrado_invoicing::InvoiceId;
use cobrado_payments::{Payment, PaymentId, RecordPayment};

use crate::event_sink::{EventSink, envelope_for};
use crate::repository::{InvoiceRepository, PaymentRepository};

const AGGREGATE_TYPE: &str = "payments.payment";

async fn load(payments: &dyn PaymentRepository, id: PaymentId) -> DomainResult<Payment> {
    payments
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Payment", id))
}

#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    pub invoice_id: InvoiceId,
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub amount: u64,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<DateTime<Utc>>,
    pub gateway_payment_id: Option<String>,
}

/// Record funds received against an existing invoice.
pub struct CreatePayment {
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    events: Arc<dyn EventSink>,
}

impl CreatePayment {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            payments,
            invoices,
            events,
        }
    }

    pub async fn execute(&self, input: CreatePaymentInput) -> DomainResult<Payment> {
        if self.invoices.find_by_id(input.invoice_id).await?.is_none() {
            return Err(DomainError::not_found("Invoice", input.invoice_id));
        }

        let (payment, event) = Payment::record(RecordPayment {
            invoice_id: input.invoice_id,
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            amount: input.amount,
            payment_method: input.payment_method,
            payment_date: input.payment_date,
            gateway_payment_id: input.gateway_payment_id,
            occurred_at: Utc::now(),
        })?;

        self.payments.create(&payment).await?;
        self.events.publish(envelope_for(
            payment.tenant_id(),
            payment.id_typed().0,
            AGGREGATE_TYPE,
            payment.version(),
            &event,
        ));
        tracing::info!(
            payment_id = %payment.id_typed(),
            invoice_id = %payment.invoice_id(),
            "payment recorded"
        );

        Ok(payment)
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmPaymentInput {
    pub payment_id: PaymentId,
    /// Defaults to the current time.
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Confirm a payment, then settle its invoice.
///
/// Two independent persistence writes with no atomicity: a crash after the
/// payment update but before the invoice update leaves a confirmed payment
/// against a pending invoice. That window is accepted here and repaired by
/// [`crate::reconciliation::ReconcilePayments`].
pub struct ConfirmPayment {
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    events: Arc<dyn EventSink>,
}

impl ConfirmPayment {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            payments,
            invoices,
            events,
        }
    }

    pub async fn execute(&self, input: ConfirmPaymentInput) -> DomainResult<Payment> {
        let confirmed_at = input.confirmed_at.unwrap_or_else(Utc::now);

        let mut payment = load(self.payments.as_ref(), input.payment_id).await?;
        let payment_event = payment.confirm(confirmed_at)?;
        self.payments.update(&payment).await?;
        self.events.publish(envelope_for(
            payment.tenant_id(),
            payment.id_typed().0,
            AGGREGATE_TYPE,
            payment.version(),
            &payment_event,
        ));

        // Second write of the sequence.
        match self.invoices.find_by_id(payment.invoice_id()).await? {
            Some(mut invoice) => {
                let invoice_event = invoice.mark_as_paid(confirmed_at)?;
                self.invoices.update(&invoice).await?;
                self.events.publish(envelope_for(
                    invoice.tenant_id(),
                    invoice.id_typed().0,
                    crate::use_cases::invoices::AGGREGATE_TYPE,
                    invoice.version(),
                    &invoice_event,
                ));
            }
            None => {
                tracing::warn!(
                    payment_id = %payment.id_typed(),
                    invoice_id = %payment.invoice_id(),
                    "confirmed payment references a missing invoice"
                );
            }
        }

        tracing::info!(payment_id = %payment.id_typed(), "payment confirmed");
        Ok(payment)
    }
}

/// Mark a payment as failed. Confirmed payments never fail.
pub struct FailPayment {
    payments: Arc<dyn PaymentRepository>,
    events: Arc<dyn EventSink>,
}

impl FailPayment {
    pub fn new(payments: Arc<dyn PaymentRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { payments, events }
    }

    pub async fn execute(&self, payment_id: PaymentId) -> DomainResult<Payment> {
        let mut payment = load(self.payments.as_ref(), payment_id).await?;
        let event = payment.fail(Utc::now())?;

        self.payments.update(&payment).await?;
        self.events.publish(envelope_for(
            payment.tenant_id(),
            payment.id_typed().0,
            AGGREGATE_TYPE,
            payment.version(),
            &event,
        ));

        Ok(payment)
    }
}

/// Refund a confirmed payment.
pub struct RefundPayment {
    payments: Arc<dyn PaymentRepository>,
    events: Arc<dyn EventSink>,
}

impl RefundPayment {
    pub fn new(payments: Arc<dyn PaymentRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { payments, events }
    }

    pub async fn execute(&self, payment_id: PaymentId) -> DomainResult<Payment> {
        let mut payment = load(self.payments.as_ref(), payment_id).await?;
        let event = payment.refund(Utc::now())?;

        self.payments.update(&payment).await?;
        self.events.publish(envelope_for(
            payment.tenant_id(),
            payment.id_typed().0,
            AGGREGATE_TYPE,
            payment.version(),
            &event,
        ));
        tracing::info!(payment_id = %payment.id_typed(), "payment refunded");

        Ok(payment)
    }
}
