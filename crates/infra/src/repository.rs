//! Per-entity repository contracts.
//!
//! Abstract persistence seams implemented by an out-of-scope durable
//! adapter ([`crate::memory`] provides the in-memory test doubles). All
//! methods are async IO; every error is a [`cobrado_core::DomainError`]:
//! `update`/`delete` on an unknown id fail with the not-found
//! specialization, and `create` on an existing id is a conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cobrado_core::{DomainResult, TenantId};
use cobrado_customers::{Customer, CustomerId};
use cobrado_invoicing::{Invoice, InvoiceId, InvoiceStatus};
use cobrado_ledger::{Transaction, TransactionId, TransactionStatus};
use cobrado_payments::{Payment, PaymentId, PaymentStatus};
use cobrado_subscriptions::{Subscription, SubscriptionId, SubscriptionStatus};
use cobrado_tenants::Tenant;

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: &Tenant) -> DomainResult<()>;
    async fn find_by_id(&self, id: TenantId) -> DomainResult<Option<Tenant>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<Tenant>>;
    async fn find_by_document(&self, document: &str) -> DomainResult<Option<Tenant>>;
    async fn update(&self, tenant: &Tenant) -> DomainResult<()>;
    async fn delete(&self, id: TenantId) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<Tenant>>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, customer: &Customer) -> DomainResult<()>;
    async fn find_by_id(&self, id: CustomerId) -> DomainResult<Option<Customer>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<Customer>>;
    async fn find_by_document(&self, document: &str) -> DomainResult<Option<Customer>>;
    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Customer>>;
    async fn update(&self, customer: &Customer) -> DomainResult<()>;
    async fn delete(&self, id: CustomerId) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<Customer>>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn create(&self, subscription: &Subscription) -> DomainResult<()>;
    async fn find_by_id(&self, id: SubscriptionId) -> DomainResult<Option<Subscription>>;
    async fn find_by_customer(&self, customer_id: CustomerId) -> DomainResult<Vec<Subscription>>;
    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Subscription>>;
    async fn find_by_status(&self, status: SubscriptionStatus) -> DomainResult<Vec<Subscription>>;
    async fn update(&self, subscription: &Subscription) -> DomainResult<()>;
    async fn delete(&self, id: SubscriptionId) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<Subscription>>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn create(&self, invoice: &Invoice) -> DomainResult<()>;
    async fn find_by_id(&self, id: InvoiceId) -> DomainResult<Option<Invoice>>;
    async fn find_by_customer(&self, customer_id: CustomerId) -> DomainResult<Vec<Invoice>>;
    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Invoice>>;
    async fn find_by_status(&self, status: InvoiceStatus) -> DomainResult<Vec<Invoice>>;
    /// Pending invoices whose due date is strictly before `now`.
    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Invoice>>;
    async fn update(&self, invoice: &Invoice) -> DomainResult<()>;
    async fn delete(&self, id: InvoiceId) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<Invoice>>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: &Payment) -> DomainResult<()>;
    async fn find_by_id(&self, id: PaymentId) -> DomainResult<Option<Payment>>;
    async fn find_by_invoice(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Payment>>;
    async fn find_by_customer(&self, customer_id: CustomerId) -> DomainResult<Vec<Payment>>;
    async fn find_by_status(&self, status: PaymentStatus) -> DomainResult<Vec<Payment>>;
    async fn update(&self, payment: &Payment) -> DomainResult<()>;
    async fn delete(&self, id: PaymentId) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<Payment>>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: &Transaction) -> DomainResult<()>;
    async fn find_by_id(&self, id: TransactionId) -> DomainResult<Option<Transaction>>;
    async fn find_by_invoice(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Transaction>>;
    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Transaction>>;
    async fn find_by_status(&self, status: TransactionStatus) -> DomainResult<Vec<Transaction>>;
    async fn update(&self, transaction: &Transaction) -> DomainResult<()>;
    async fn delete(&self, id: TransactionId) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<Transaction>>;
}
