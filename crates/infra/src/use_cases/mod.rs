//! Use-case orchestrators.
//!
//! One struct per operation, all with the same control flow: load entities
//! through repositories, apply a validated transition, persist, then publish
//! the committed event. Entities never call repositories.

pub mod customers;
pub mod invoices;
pub mod payments;
pub mod subscriptions;
pub mod tenants;
pub mod transactions;
