//! In-memory repository adapters.
//!
//! Snapshot stores over `RwLock<HashMap>`, intended for tests/dev. Each
//! adapter persists the entity's raw props and reconstitutes on read, the
//! same trusted path a durable adapter would use.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cobrado_core::{DomainError, DomainResult, TenantId};
use cobrado_customers::{Customer, CustomerId, CustomerProps};
use cobrado_invoicing::{Invoice, InvoiceId, InvoiceProps, InvoiceStatus};
use cobrado_ledger::{Transaction, TransactionId, TransactionProps, TransactionStatus};
use cobrado_payments::{Payment, PaymentId, PaymentProps, PaymentStatus};
use cobrado_subscriptions::{Subscription, SubscriptionId, SubscriptionProps, SubscriptionStatus};
use cobrado_tenants::{Tenant, TenantProps};

use crate::repository::{
    CustomerRepository, InvoiceRepository, PaymentRepository, SubscriptionRepository,
    TenantRepository, TransactionRepository,
};

fn poisoned() -> DomainError {
    DomainError::conflict("in-memory store lock poisoned")
}

/// In-memory tenant store.
#[derive(Debug, Default)]
pub struct InMemoryTenantRepository {
    rows: RwLock<HashMap<TenantId, TenantProps>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn create(&self, tenant: &Tenant) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&tenant.id_typed()) {
            return Err(DomainError::conflict("tenant already exists"));
        }
        rows.insert(tenant.id_typed(), tenant.props().clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TenantId) -> DomainResult<Option<Tenant>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned().map(Tenant::reconstitute))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<Tenant>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .find(|p| p.email == email)
            .cloned()
            .map(Tenant::reconstitute))
    }

    async fn find_by_document(&self, document: &str) -> DomainResult<Option<Tenant>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .find(|p| p.document.as_deref() == Some(document))
            .cloned()
            .map(Tenant::reconstitute))
    }

    async fn update(&self, tenant: &Tenant) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if !rows.contains_key(&tenant.id_typed()) {
            return Err(DomainError::not_found("Tenant", tenant.id_typed()));
        }
        rows.insert(tenant.id_typed(), tenant.props().clone());
        Ok(())
    }

    async fn delete(&self, id: TenantId) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Tenant", id))
    }

    async fn list(&self) -> DomainResult<Vec<Tenant>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().map(Tenant::reconstitute).collect())
    }
}

/// In-memory customer store.
#[derive(Debug, Default)]
pub struct InMemoryCustomerRepository {
    rows: RwLock<HashMap<CustomerId, CustomerProps>>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn create(&self, customer: &Customer) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&customer.id_typed()) {
            return Err(DomainError::conflict("customer already exists"));
        }
        rows.insert(customer.id_typed(), customer.props().clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CustomerId) -> DomainResult<Option<Customer>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned().map(Customer::reconstitute))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<Customer>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .find(|p| p.email == email)
            .cloned()
            .map(Customer::reconstitute))
    }

    async fn find_by_document(&self, document: &str) -> DomainResult<Option<Customer>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .find(|p| p.document.as_deref() == Some(document))
            .cloned()
            .map(Customer::reconstitute))
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Customer>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .map(Customer::reconstitute)
            .collect())
    }

    async fn update(&self, customer: &Customer) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if !rows.contains_key(&customer.id_typed()) {
            return Err(DomainError::not_found("Customer", customer.id_typed()));
        }
        rows.insert(customer.id_typed(), customer.props().clone());
        Ok(())
    }

    async fn delete(&self, id: CustomerId) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Customer", id))
    }

    async fn list(&self) -> DomainResult<Vec<Customer>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().map(Customer::reconstitute).collect())
    }
}

/// In-memory subscription store.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    rows: RwLock<HashMap<SubscriptionId, SubscriptionProps>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn create(&self, subscription: &Subscription) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&subscription.id_typed()) {
            return Err(DomainError::conflict("subscription already exists"));
        }
        rows.insert(subscription.id_typed(), subscription.props().clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SubscriptionId) -> DomainResult<Option<Subscription>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned().map(Subscription::reconstitute))
    }

    async fn find_by_customer(&self, customer_id: CustomerId) -> DomainResult<Vec<Subscription>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .map(Subscription::reconstitute)
            .collect())
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Subscription>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .map(Subscription::reconstitute)
            .collect())
    }

    async fn find_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> DomainResult<Vec<Subscription>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .map(Subscription::reconstitute)
            .collect())
    }

    async fn update(&self, subscription: &Subscription) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if !rows.contains_key(&subscription.id_typed()) {
            return Err(DomainError::not_found(
                "Subscription",
                subscription.id_typed(),
            ));
        }
        rows.insert(subscription.id_typed(), subscription.props().clone());
        Ok(())
    }

    async fn delete(&self, id: SubscriptionId) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Subscription", id))
    }

    async fn list(&self) -> DomainResult<Vec<Subscription>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .cloned()
            .map(Subscription::reconstitute)
            .collect())
    }
}

/// In-memory invoice store.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceRepository {
    rows: RwLock<HashMap<InvoiceId, InvoiceProps>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn create(&self, invoice: &Invoice) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&invoice.id_typed()) {
            return Err(DomainError::conflict("invoice already exists"));
        }
        rows.insert(invoice.id_typed(), invoice.props().clone());
        Ok(())
    }

    async fn find_by_id(&self, id: InvoiceId) -> DomainResult<Option<Invoice>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned().map(Invoice::reconstitute))
    }

    async fn find_by_customer(&self, customer_id: CustomerId) -> DomainResult<Vec<Invoice>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .map(Invoice::reconstitute)
            .collect())
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Invoice>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .map(Invoice::reconstitute)
            .collect())
    }

    async fn find_by_status(&self, status: InvoiceStatus) -> DomainResult<Vec<Invoice>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .map(Invoice::reconstitute)
            .collect())
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Invoice>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.status == InvoiceStatus::Pending && p.due_date < now)
            .cloned()
            .map(Invoice::reconstitute)
            .collect())
    }

    async fn update(&self, invoice: &Invoice) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if !rows.contains_key(&invoice.id_typed()) {
            return Err(DomainError::not_found("Invoice", invoice.id_typed()));
        }
        rows.insert(invoice.id_typed(), invoice.props().clone());
        Ok(())
    }

    async fn delete(&self, id: InvoiceId) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Invoice", id))
    }

    async fn list(&self) -> DomainResult<Vec<Invoice>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().map(Invoice::reconstitute).collect())
    }
}

/// In-memory payment store.
#[derive(Debug, Default)]
pub struct InMemoryPaymentRepository {
    rows: RwLock<HashMap<PaymentId, PaymentProps>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, payment: &Payment) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&payment.id_typed()) {
            return Err(DomainError::conflict("payment already exists"));
        }
        rows.insert(payment.id_typed(), payment.props().clone());
        Ok(())
    }

    async fn find_by_id(&self, id: PaymentId) -> DomainResult<Option<Payment>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned().map(Payment::reconstitute))
    }

    async fn find_by_invoice(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Payment>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .map(Payment::reconstitute)
            .collect())
    }

    async fn find_by_customer(&self, customer_id: CustomerId) -> DomainResult<Vec<Payment>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.customer_id == customer_id)
            .cloned()
            .map(Payment::reconstitute)
            .collect())
    }

    async fn find_by_status(&self, status: PaymentStatus) -> DomainResult<Vec<Payment>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .map(Payment::reconstitute)
            .collect())
    }

    async fn update(&self, payment: &Payment) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if !rows.contains_key(&payment.id_typed()) {
            return Err(DomainError::not_found("Payment", payment.id_typed()));
        }
        rows.insert(payment.id_typed(), payment.props().clone());
        Ok(())
    }

    async fn delete(&self, id: PaymentId) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Payment", id))
    }

    async fn list(&self) -> DomainResult<Vec<Payment>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.values().cloned().map(Payment::reconstitute).collect())
    }
}

/// In-memory transaction store.
#[derive(Debug, Default)]
pub struct InMemoryTransactionRepository {
    rows: RwLock<HashMap<TransactionId, TransactionProps>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if rows.contains_key(&transaction.id_typed()) {
            return Err(DomainError::conflict("transaction already exists"));
        }
        rows.insert(transaction.id_typed(), transaction.props().clone());
        Ok(())
    }

    async fn find_by_id(&self, id: TransactionId) -> DomainResult<Option<Transaction>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows.get(&id).cloned().map(Transaction::reconstitute))
    }

    async fn find_by_invoice(&self, invoice_id: InvoiceId) -> DomainResult<Vec<Transaction>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .map(Transaction::reconstitute)
            .collect())
    }

    async fn find_by_tenant(&self, tenant_id: TenantId) -> DomainResult<Vec<Transaction>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .map(Transaction::reconstitute)
            .collect())
    }

    async fn find_by_status(
        &self,
        status: TransactionStatus,
    ) -> DomainResult<Vec<Transaction>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .map(Transaction::reconstitute)
            .collect())
    }

    async fn update(&self, transaction: &Transaction) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        if !rows.contains_key(&transaction.id_typed()) {
            return Err(DomainError::not_found(
                "Transaction",
                transaction.id_typed(),
            ));
        }
        rows.insert(transaction.id_typed(), transaction.props().clone());
        Ok(())
    }

    async fn delete(&self, id: TransactionId) -> DomainResult<()> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found("Transaction", id))
    }

    async fn list(&self) -> DomainResult<Vec<Transaction>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .values()
            .cloned()
            .map(Transaction::reconstitute)
            .collect())
    }
}
