use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cobrado_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_events::Event;
use cobrado_invoicing::InvoiceId;

/// Transaction identifier (tenant-scoped via `tenant_id` on the aggregate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub AggregateId);

impl TransactionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What a ledger entry audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    PlatformFee,
    Refund,
    Adjustment,
}

/// Transaction status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Allowed status transitions. Completed is terminal; Failed -> Failed
    /// keeps `fail` tolerant of repeats.
    pub fn can_transition(self, to: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, to),
            (Pending, Completed) | (Pending, Failed) | (Failed, Failed)
        )
    }
}

/// Raw state of a ledger transaction.
///
/// Doubles as the trusted reconstitution input, the repository record, and
/// the transport projection (all public fields, verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProps {
    pub id: TransactionId,
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub kind: TransactionType,
    /// Audited amount, in cents.
    pub amount: u64,
    /// Rate that produced `amount`, in basis points of `base_amount`.
    pub percentage_bps: u32,
    /// Amount the rate was applied to, in cents.
    pub base_amount: u64,
    pub status: TransactionStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording a generic ledger transaction (starts Pending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTransaction {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub kind: TransactionType,
    pub amount: u64,
    pub percentage_bps: u32,
    pub base_amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Input for auditing a platform fee already taken on an invoice.
///
/// `amount` and `base_amount` come straight from the invoice's frozen
/// `platform_fee`/`amount`; there is no pending phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPlatformFee {
    pub tenant_id: TenantId,
    pub invoice_id: InvoiceId,
    pub amount: u64,
    pub percentage_bps: u32,
    pub base_amount: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: Transaction (ledger entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    props: TransactionProps,
}

impl Transaction {
    /// Validating factory: rejects malformed input before any state exists.
    pub fn record(input: RecordTransaction) -> DomainResult<(Self, TransactionEvent)> {
        Self::build(
            input.tenant_id,
            input.invoice_id,
            input.kind,
            input.amount,
            input.percentage_bps,
            input.base_amount,
            TransactionStatus::Pending,
            None,
            input.occurred_at,
        )
    }

    /// Specialized factory: a platform-fee audit record, Completed
    /// immediately with `processed_at` set.
    pub fn record_platform_fee(
        input: RecordPlatformFee,
    ) -> DomainResult<(Self, TransactionEvent)> {
        Self::build(
            input.tenant_id,
            input.invoice_id,
            TransactionType::PlatformFee,
            input.amount,
            input.percentage_bps,
            input.base_amount,
            TransactionStatus::Completed,
            Some(input.occurred_at),
            input.occurred_at,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        tenant_id: TenantId,
        invoice_id: InvoiceId,
        kind: TransactionType,
        amount: u64,
        percentage_bps: u32,
        base_amount: u64,
        status: TransactionStatus,
        processed_at: Option<DateTime<Utc>>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<(Self, TransactionEvent)> {
        if amount == 0 {
            return Err(DomainError::validation("amount must be positive"));
        }

        let id = TransactionId::new(AggregateId::new());
        let transaction = Self {
            props: TransactionProps {
                id,
                tenant_id,
                invoice_id,
                kind,
                amount,
                percentage_bps,
                base_amount,
                status,
                processed_at,
                version: 1,
                created_at: occurred_at,
                updated_at: occurred_at,
            },
        };

        let event = TransactionEvent::TransactionRecorded(TransactionRecorded {
            tenant_id,
            transaction_id: id,
            invoice_id,
            kind,
            amount,
            status,
            occurred_at,
        });

        Ok((transaction, event))
    }

    /// Trusted-source path: rebuild from stored props, skipping validation.
    pub fn reconstitute(props: TransactionProps) -> Self {
        Self { props }
    }

    /// Settle the entry. Fails once Completed or Failed.
    pub fn complete(&mut self, processed_at: DateTime<Utc>) -> DomainResult<TransactionEvent> {
        if !self.props.status.can_transition(TransactionStatus::Completed) {
            return Err(match self.props.status {
                TransactionStatus::Completed => {
                    DomainError::invariant("transaction already completed")
                }
                _ => DomainError::invariant("failed transaction cannot be completed"),
            });
        }

        self.props.status = TransactionStatus::Completed;
        self.props.processed_at = Some(processed_at);
        self.touch(processed_at);

        Ok(TransactionEvent::TransactionCompleted(
            TransactionCompleted {
                tenant_id: self.props.tenant_id,
                transaction_id: self.props.id,
                invoice_id: self.props.invoice_id,
                processed_at,
                occurred_at: processed_at,
            },
        ))
    }

    /// Mark the entry as failed. A completed transaction cannot fail.
    pub fn fail(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<TransactionEvent> {
        if !self.props.status.can_transition(TransactionStatus::Failed) {
            return Err(DomainError::invariant(
                "completed transaction cannot fail",
            ));
        }

        self.props.status = TransactionStatus::Failed;
        self.touch(occurred_at);

        Ok(TransactionEvent::TransactionFailed(TransactionFailed {
            tenant_id: self.props.tenant_id,
            transaction_id: self.props.id,
            invoice_id: self.props.invoice_id,
            occurred_at,
        }))
    }

    pub fn is_completed(&self) -> bool {
        self.props.status == TransactionStatus::Completed
    }

    fn touch(&mut self, occurred_at: DateTime<Utc>) {
        self.props.updated_at = occurred_at;
        self.props.version += 1;
    }

    pub fn props(&self) -> &TransactionProps {
        &self.props
    }

    pub fn id_typed(&self) -> TransactionId {
        self.props.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.props.tenant_id
    }

    pub fn invoice_id(&self) -> InvoiceId {
        self.props.invoice_id
    }

    pub fn kind(&self) -> TransactionType {
        self.props.kind
    }

    pub fn amount(&self) -> u64 {
        self.props.amount
    }

    pub fn percentage_bps(&self) -> u32 {
        self.props.percentage_bps
    }

    pub fn base_amount(&self) -> u64 {
        self.props.base_amount
    }

    pub fn status(&self) -> TransactionStatus {
        self.props.status
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.props.processed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.props.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.props.updated_at
    }
}

impl AggregateRoot for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.props.id
    }

    fn version(&self) -> u64 {
        self.props.version
    }
}

/// Event: TransactionRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecorded {
    pub tenant_id: TenantId,
    pub transaction_id: TransactionId,
    pub invoice_id: InvoiceId,
    pub kind: TransactionType,
    pub amount: u64,
    /// Initial status: Pending for generic entries, Completed for
    /// platform-fee audit records.
    pub status: TransactionStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionCompleted {
    pub tenant_id: TenantId,
    pub transaction_id: TransactionId,
    pub invoice_id: InvoiceId,
    pub processed_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TransactionFailed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFailed {
    pub tenant_id: TenantId,
    pub transaction_id: TransactionId,
    pub invoice_id: InvoiceId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionEvent {
    TransactionRecorded(TransactionRecorded),
    TransactionCompleted(TransactionCompleted),
    TransactionFailed(TransactionFailed),
}

impl Event for TransactionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransactionEvent::TransactionRecorded(_) => "ledger.transaction.recorded",
            TransactionEvent::TransactionCompleted(_) => "ledger.transaction.completed",
            TransactionEvent::TransactionFailed(_) => "ledger.transaction.failed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TransactionEvent::TransactionRecorded(e) => e.occurred_at,
            TransactionEvent::TransactionCompleted(e) => e.occurred_at,
            TransactionEvent::TransactionFailed(e) => e.occurred_at,
        }
    }
}
