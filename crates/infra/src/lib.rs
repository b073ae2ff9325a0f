//! Infrastructure layer: repository contracts, in-memory adapters,
//! use-case orchestration, event distribution, and reconciliation.
//!
//! Entities never touch repositories; every multi-step flow lives here.
//! Repository calls are async IO awaited sequentially — there are no
//! transactions spanning repositories, and multi-write flows (confirm
//! payment, then mark its invoice paid) accept the resulting inconsistency
//! window; [`reconciliation`] is the caller-invokable repair.

pub mod event_sink;
pub mod memory;
pub mod reconciliation;
pub mod repository;
pub mod use_cases;

#[cfg(test)]
mod integration_tests;

pub use event_sink::{BusSink, EventSink, NullSink};
pub use repository::{
    CustomerRepository, InvoiceRepository, PaymentRepository, SubscriptionRepository,
    TenantRepository, TransactionRepository,
};
