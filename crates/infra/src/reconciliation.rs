//! Repair hook for the confirm-payment inconsistency window.
//!
//! Confirming a payment and settling its invoice are two independent
//! writes; a crash between them strands a confirmed payment against an
//! unsettled invoice. This scan finds those strays and settles the invoice,
//! using the payment's own confirmation time so the repaired record reads
//! as if the second write had landed. Idempotent: repeated runs find
//! nothing new.

use std::sync::Arc;

use cobrado_core::{AggregateRoot, DomainResult};
use cobrado_invoicing::InvoiceStatus;
use cobrado_payments::PaymentStatus;

use crate::event_sink::{EventSink, envelope_for};
use crate::repository::{InvoiceRepository, PaymentRepository};

pub struct ReconcilePayments {
    payments: Arc<dyn PaymentRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    events: Arc<dyn EventSink>,
}

impl ReconcilePayments {
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

    /// Settle every unsettled invoice that has a confirmed payment.
    /// Returns how many invoices were repaired.
    pub async fn execute(&self) -> DomainResult<u32> {
        let confirmed = self
            .payments
            .find_by_status(PaymentStatus::Confirmed)
            .await?;

        let mut repaired = 0u32;
        for payment in confirmed {
            let Some(mut invoice) = self.invoices.find_by_id(payment.invoice_id()).await? else {
                tracing::warn!(
                    payment_id = %payment.id_typed(),
                    invoice_id = %payment.invoice_id(),
                    "confirmed payment references a missing invoice"
                );
                continue;
            };

            if !matches!(
                invoice.status(),
                InvoiceStatus::Pending | InvoiceStatus::Overdue
            ) {
                continue;
            }

            let paid_at = payment.confirmed_at().unwrap_or(payment.updated_at());
            let event = invoice.mark_as_paid(paid_at)?;
            self.invoices.update(&invoice).await?;
            self.events.publish(envelope_for(
                invoice.tenant_id(),
                invoice.id_typed().0,
                crate::use_cases::invoices::AGGREGATE_TYPE,
                invoice.version(),
                &event,
            ));

            tracing::info!(
                payment_id = %payment.id_typed(),
                invoice_id = %invoice.id_typed(),
                "reconciled confirmed payment with unsettled invoice"
            );
            repaired += 1;
        }

        Ok(repaired)
    }
}
