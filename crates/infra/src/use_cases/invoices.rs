use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use cobrado_billing::{FeeSchedule, PaymentMethod};
use cobrado_core::{AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_customers::CustomerId;
use cobrado_invoicing::{Invoice, InvoiceId, IssueInvoice};
use cobrado_subscriptions::SubscriptionId;

use crate::event_sink::{EventSink, envelope_for};
use crate::repository::{InvoiceRepository, TenantRepository};

pub(crate) const AGGREGATE_TYPE: &str = "invoicing.invoice";

/// Invoice numbers are opaque and unique; a time-ordered UUID keeps them
/// sortable without a counter.
pub(crate) fn generate_invoice_number() -> String {
    format!("INV-{}", Uuid::now_v7().simple())
}

async fn load(invoices: &dyn InvoiceRepository, id: InvoiceId) -> DomainResult<Invoice> {
    invoices
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Invoice", id))
}

#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub subscription_id: Option<SubscriptionId>,
    pub amount: u64,
    pub due_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    /// Generated from a time-ordered UUID when absent.
    pub invoice_number: Option<String>,
}

/// Issue an ad hoc invoice for a tenant's customer.
///
/// The fee breakdown comes from the owning tenant's fee percentage and the
/// injected gateway fee schedule, frozen into the invoice at issue time.
pub struct CreateInvoice {
    invoices: Arc<dyn InvoiceRepository>,
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
    fee_schedule: FeeSchedule,
}

impl CreateInvoice {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        tenants: Arc<dyn TenantRepository>,
        events: Arc<dyn EventSink>,
        fee_schedule: FeeSchedule,
    ) -> Self {
        Self {
            invoices,
            tenants,
            events,
            fee_schedule,
        }
    }

    pub async fn execute(&self, input: CreateInvoiceInput) -> DomainResult<Invoice> {
        let tenant = self
            .tenants
            .find_by_id(input.tenant_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Tenant", input.tenant_id))?;

        let (invoice, event) = Invoice::issue(IssueInvoice {
            tenant_id: input.tenant_id,
            customer_id: input.customer_id,
            subscription_id: input.subscription_id,
            invoice_number: input.invoice_number.unwrap_or_else(generate_invoice_number),
            amount: input.amount,
            due_date: input.due_date,
            payment_method: input.payment_method,
            platform_fee_bps: tenant.fee_percentage_bps(),
            fee_schedule: self.fee_schedule,
            occurred_at: Utc::now(),
        })?;

        self.invoices.create(&invoice).await?;
        self.events.publish(envelope_for(
            invoice.tenant_id(),
            invoice.id_typed().0,
            AGGREGATE_TYPE,
            invoice.version(),
            &event,
        ));
        tracing::info!(
            tenant_id = %invoice.tenant_id(),
            invoice_id = %invoice.id_typed(),
            amount = invoice.amount(),
            "invoice issued"
        );

        Ok(invoice)
    }
}

/// Cancel an invoice. Fails when it is already paid.
pub struct CancelInvoice {
    invoices: Arc<dyn InvoiceRepository>,
    events: Arc<dyn EventSink>,
}

impl CancelInvoice {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { invoices, events }
    }

    pub async fn execute(&self, invoice_id: InvoiceId) -> DomainResult<Invoice> {
        let mut invoice = load(self.invoices.as_ref(), invoice_id).await?;
        let event = invoice.cancel(Utc::now())?;

        self.invoices.update(&invoice).await?;
        self.events.publish(envelope_for(
            invoice.tenant_id(),
            invoice.id_typed().0,
            AGGREGATE_TYPE,
            invoice.version(),
            &event,
        ));

        Ok(invoice)
    }
}

#[derive(Debug, Clone)]
pub struct AttachGatewayChargeInput {
    pub invoice_id: InvoiceId,
    pub gateway_charge_id: String,
    pub payment_link: String,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
}

/// Attach gateway charge references produced by the external gateway client.
pub struct AttachGatewayCharge {
    invoices: Arc<dyn InvoiceRepository>,
    events: Arc<dyn EventSink>,
}

impl AttachGatewayCharge {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { invoices, events }
    }

    pub async fn execute(&self, input: AttachGatewayChargeInput) -> DomainResult<Invoice> {
        let mut invoice = load(self.invoices.as_ref(), input.invoice_id).await?;
        let event = invoice.link_gateway_charge(
            input.gateway_charge_id,
            input.payment_link,
            input.pix_qr_code,
            input.pix_copy_paste,
            Utc::now(),
        );

        self.invoices.update(&invoice).await?;
        self.events.publish(envelope_for(
            invoice.tenant_id(),
            invoice.id_typed().0,
            AGGREGATE_TYPE,
            invoice.version(),
            &event,
        ));

        Ok(invoice)
    }
}

/// Scheduler sweep: flag every pending invoice past its due date.
///
/// The external scheduler invokes this with its polling time; each flagged
/// invoice is persisted independently.
pub struct MarkOverdueInvoices {
    invoices: Arc<dyn InvoiceRepository>,
    events: Arc<dyn EventSink>,
}

impl MarkOverdueInvoices {
    pub fn new(invoices: Arc<dyn InvoiceRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { invoices, events }
    }

    pub async fn execute(&self, now: DateTime<Utc>) -> DomainResult<Vec<Invoice>> {
        let due = self.invoices.find_overdue(now).await?;
        let mut flagged = Vec::with_capacity(due.len());

        for mut invoice in due {
            let Some(event) = invoice.mark_as_overdue(now) else {
                continue;
            };
            self.invoices.update(&invoice).await?;
            self.events.publish(envelope_for(
                invoice.tenant_id(),
                invoice.id_typed().0,
                AGGREGATE_TYPE,
                invoice.version(),
                &event,
            ));
            flagged.push(invoice);
        }

        if !flagged.is_empty() {
            tracing::info!(count = flagged.len(), "invoices marked overdue");
        }

        Ok(flagged)
    }
}
