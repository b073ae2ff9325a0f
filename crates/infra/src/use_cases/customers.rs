use std::sync::Arc;

use chrono::Utc;

use cobrado_core::{AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_customers::{Address, Customer, CustomerId, RegisterCustomer};

use crate::event_sink::{EventSink, envelope_for};
use crate::repository::{CustomerRepository, TenantRepository};

const AGGREGATE_TYPE: &str = "customers.customer";

async fn load(customers: &dyn CustomerRepository, id: CustomerId) -> DomainResult<Customer> {
    customers
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Customer", id))
}

#[derive(Debug, Clone)]
pub struct CreateCustomerInput {
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: Option<String>,
}

/// Register a customer under an existing tenant.
///
/// Fails with the not-found specialization when the tenant is missing, and
/// with a conflict when the email or document is already registered.
pub struct CreateCustomer {
    customers: Arc<dyn CustomerRepository>,
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
}

impl CreateCustomer {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        tenants: Arc<dyn TenantRepository>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            customers,
            tenants,
            events,
        }
    }

    pub async fn execute(&self, input: CreateCustomerInput) -> DomainResult<Customer> {
        if self.tenants.find_by_id(input.tenant_id).await?.is_none() {
            return Err(DomainError::not_found("Tenant", input.tenant_id));
        }

        if self.customers.find_by_email(&input.email).await?.is_some() {
            return Err(DomainError::conflict("email already registered"));
        }
        if let Some(document) = &input.document {
            if self.customers.find_by_document(document).await?.is_some() {
                return Err(DomainError::conflict("document already registered"));
            }
        }

        let (customer, event) = Customer::register(RegisterCustomer {
            tenant_id: input.tenant_id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            document: input.document,
            address: None,
            occurred_at: Utc::now(),
        })?;

        self.customers.create(&customer).await?;
        self.events.publish(envelope_for(
            customer.tenant_id(),
            customer.id_typed().0,
            AGGREGATE_TYPE,
            customer.version(),
            &event,
        ));
        tracing::info!(
            tenant_id = %customer.tenant_id(),
            customer_id = %customer.id_typed(),
            "customer registered"
        );

        Ok(customer)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateCustomerInput {
    pub customer_id: CustomerId,
    /// Email and phone are replaced together or not at all.
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

/// Update a customer's contact info and/or address.
pub struct UpdateCustomer {
    customers: Arc<dyn CustomerRepository>,
    events: Arc<dyn EventSink>,
}

impl UpdateCustomer {
    pub fn new(customers: Arc<dyn CustomerRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { customers, events }
    }

    pub async fn execute(&self, input: UpdateCustomerInput) -> DomainResult<Customer> {
        let mut customer = load(self.customers.as_ref(), input.customer_id).await?;
        let now = Utc::now();

        let mut events = Vec::new();
        match (input.email, input.phone) {
            (Some(email), Some(phone)) => {
                events.push(customer.update_contact_info(email, phone, now)?);
            }
            (None, None) => {}
            _ => {
                return Err(DomainError::validation(
                    "email and phone must be updated together",
                ));
            }
        }
        if let Some(address) = input.address {
            events.push(customer.update_address(address, now));
        }

        if events.is_empty() {
            return Ok(customer);
        }

        self.customers.update(&customer).await?;

        let base = customer.version() - events.len() as u64;
        for (i, event) in events.iter().enumerate() {
            self.events.publish(envelope_for(
                customer.tenant_id(),
                customer.id_typed().0,
                AGGREGATE_TYPE,
                base + 1 + i as u64,
                event,
            ));
        }

        Ok(customer)
    }
}

/// Re-enable a customer. Idempotent in state.
pub struct ActivateCustomer {
    customers: Arc<dyn CustomerRepository>,
    events: Arc<dyn EventSink>,
}

impl ActivateCustomer {
    pub fn new(customers: Arc<dyn CustomerRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { customers, events }
    }

    pub async fn execute(&self, customer_id: CustomerId) -> DomainResult<Customer> {
        let mut customer = load(self.customers.as_ref(), customer_id).await?;
        let event = customer.activate(Utc::now());

        self.customers.update(&customer).await?;
        self.events.publish(envelope_for(
            customer.tenant_id(),
            customer.id_typed().0,
            AGGREGATE_TYPE,
            customer.version(),
            &event,
        ));

        Ok(customer)
    }
}

/// Disable a customer. Idempotent in state.
pub struct DeactivateCustomer {
    customers: Arc<dyn CustomerRepository>,
    events: Arc<dyn EventSink>,
}

impl DeactivateCustomer {
    pub fn new(customers: Arc<dyn CustomerRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { customers, events }
    }

    pub async fn execute(&self, customer_id: CustomerId) -> DomainResult<Customer> {
        let mut customer = load(self.customers.as_ref(), customer_id).await?;
        let event = customer.deactivate(Utc::now());

        self.customers.update(&customer).await?;
        self.events.publish(envelope_for(
            customer.tenant_id(),
            customer.id_typed().0,
            AGGREGATE_TYPE,
            customer.version(),
            &event,
        ));

        Ok(customer)
    }
}

/// Remove a customer at the repository boundary.
pub struct DeleteCustomer {
    customers: Arc<dyn CustomerRepository>,
}

impl DeleteCustomer {
    pub fn new(customers: Arc<dyn CustomerRepository>) -> Self {
        Self { customers }
    }

    pub async fn execute(&self, customer_id: CustomerId) -> DomainResult<()> {
        self.customers.delete(customer_id).await?;
        tracing::info!(customer_id = %customer_id, "customer deleted");
        Ok(())
    }
}
