//! Transaction aggregate: append-only ledger entries auditing platform
//! fees, refunds, and adjustments per invoice.

mod transaction;

pub use transaction::{
    RecordPlatformFee, RecordTransaction, Transaction, TransactionCompleted, TransactionEvent,
    TransactionFailed, TransactionId, TransactionProps, TransactionRecorded, TransactionStatus,
    TransactionType,
};
