use std::sync::Arc;

use chrono::{DateTime, Utc};

use cobrado_core::{AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_invoicing::InvoiceId;
use cobrado_ledger::{
    RecordPlatformFee as RecordPlatformFeeCmd, RecordTransaction, Transaction, TransactionId,
    TransactionType,
};

use crate::event_sink::{EventSink, envelope_for};
use crate::repository::{InvoiceRepository, TenantRepository, TransactionRepository};

pub(crate) const LEDGER_AGGREGATE_TYPE: &str = "ledger.transaction";

async fn load(
    transactions: &dyn TransactionRepository,
    id: TransactionId,
) -> DomainResult<Transaction> {
    transactions
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Transaction", id))
}

#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub kind: TransactionType,
    pub amount: u64,
    pub percentage_bps: u32,
    pub base_amount: u64,
}

/// Record a generic ledger entry (starts Pending).
pub struct CreateTransaction {
    transactions: Arc<dyn TransactionRepository>,
    events: Arc<dyn EventSink>,
}

impl CreateTransaction {
    pub fn new(transactions: Arc<dyn TransactionRepository>, events: Arc<dyn EventSink>) -> Self {
        Self {
            transactions,
            events,
        }
    }

    pub async fn execute(&self, input: CreateTransactionInput) -> DomainResult<Transaction> {
        let (transaction, event) = Transaction::record(RecordTransaction {
            tenant_id: input.tenant_id,
            invoice_id: input.invoice_id,
            kind: input.kind,
            amount: input.amount,
            percentage_bps: input.percentage_bps,
            base_amount: input.base_amount,
            occurred_at: Utc::now(),
        })?;

        self.transactions.create(&transaction).await?;
        self.events.publish(envelope_for(
            transaction.tenant_id(),
            transaction.id_typed().0,
            LEDGER_AGGREGATE_TYPE,
            transaction.version(),
            &event,
        ));

        Ok(transaction)
    }
}

/// Audit the platform fee already frozen into an invoice.
///
/// Reads the fee straight off the persisted invoice and its tenant's rate;
/// the resulting entry is Completed immediately.
pub struct RecordPlatformFee {
    transactions: Arc<dyn TransactionRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
}

impl RecordPlatformFee {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        tenants: Arc<dyn TenantRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transactions,
            invoices,
            tenants,
            events,
        }
    }

    pub async fn execute(&self, invoice_id: InvoiceId) -> DomainResult<Transaction> {
        let invoice = self
            .invoices
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Invoice", invoice_id))?;
        let tenant = self
            .tenants
            .find_by_id(invoice.tenant_id())
            .await?
            .ok_or_else(|| DomainError::not_found("Tenant", invoice.tenant_id()))?;

        let (transaction, event) = Transaction::record_platform_fee(RecordPlatformFeeCmd {
            tenant_id: invoice.tenant_id(),
            invoice_id: invoice.id_typed(),
            amount: invoice.platform_fee(),
            percentage_bps: tenant.fee_percentage_bps(),
            base_amount: invoice.amount(),
            occurred_at: Utc::now(),
        })?;

        self.transactions.create(&transaction).await?;
        self.events.publish(envelope_for(
            transaction.tenant_id(),
            transaction.id_typed().0,
            LEDGER_AGGREGATE_TYPE,
            transaction.version(),
            &event,
        ));
        tracing::info!(
            invoice_id = %invoice_id,
            amount = transaction.amount(),
            "platform fee recorded"
        );

        Ok(transaction)
    }
}

/// Settle a pending ledger entry.
pub struct CompleteTransaction {
    transactions: Arc<dyn TransactionRepository>,
    events: Arc<dyn EventSink>,
}

impl CompleteTransaction {
    pub fn new(transactions: Arc<dyn TransactionRepository>, events: Arc<dyn EventSink>) -> Self {
        Self {
            transactions,
            events,
        }
    }

    pub async fn execute(
        &self,
        transaction_id: TransactionId,
        processed_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Transaction> {
        let mut transaction = load(self.transactions.as_ref(), transaction_id).await?;
        let event = transaction.complete(processed_at.unwrap_or_else(Utc::now))?;

        self.transactions.update(&transaction).await?;
        self.events.publish(envelope_for(
            transaction.tenant_id(),
            transaction.id_typed().0,
            LEDGER_AGGREGATE_TYPE,
            transaction.version(),
            &event,
        ));

        Ok(transaction)
    }
}

/// Mark a ledger entry as failed. Completed entries never fail.
pub struct FailTransaction {
    transactions: Arc<dyn TransactionRepository>,
    events: Arc<dyn EventSink>,
}

impl FailTransaction {
    pub fn new(transactions: Arc<dyn TransactionRepository>, events: Arc<dyn EventSink>) -> Self {
        Self {
            transactions,
            events,
        }
    }

    pub async fn execute(&self, transaction_id: TransactionId) -> DomainResult<Transaction> {
        let mut transaction = load(self.transactions.as_ref(), transaction_id).await?;
        let event = transaction.fail(Utc::now())?;

        self.transactions.update(&transaction).await?;
        self.events.publish(envelope_for(
            transaction.tenant_id(),
            transaction.id_typed().0,
            LEDGER_AGGREGATE_TYPE,
            transaction.version(),
            &event,
        ));

        Ok(transaction)
    }
}
