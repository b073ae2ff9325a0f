use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cobrado_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId, ValueObject};
use cobrado_events::Event;

/// Customer identifier (tenant-scoped via `tenant_id` on the aggregate).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub AggregateId);

impl CustomerId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Postal address of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub complement: Option<String>,
}

impl ValueObject for Address {}

/// Raw state of a customer.
///
/// Doubles as the trusted reconstitution input, the repository record, and
/// the transport projection (all public fields, verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProps {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: Option<String>,
    pub address: Option<Address>,
    pub is_active: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCustomer {
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document: Option<String>,
    pub address: Option<Address>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: Customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    props: CustomerProps,
}

fn validate_email(email: &str) -> DomainResult<()> {
    if !email.contains('@') {
        return Err(DomainError::validation("email must contain '@'"));
    }
    Ok(())
}

fn validate_phone(phone: &str) -> DomainResult<()> {
    if phone.chars().count() < 10 {
        return Err(DomainError::validation(
            "phone must be at least 10 characters",
        ));
    }
    Ok(())
}

impl Customer {
    /// Validating factory: rejects malformed input before any state exists.
    pub fn register(input: RegisterCustomer) -> DomainResult<(Self, CustomerEvent)> {
        if input.name.chars().count() < 3 {
            return Err(DomainError::validation(
                "name must be at least 3 characters",
            ));
        }
        validate_email(&input.email)?;
        validate_phone(&input.phone)?;

        let id = CustomerId::new(AggregateId::new());
        let customer = Self {
            props: CustomerProps {
                id,
                tenant_id: input.tenant_id,
                name: input.name.clone(),
                email: input.email.clone(),
                phone: input.phone,
                document: input.document,
                address: input.address,
                is_active: true,
                version: 1,
                created_at: input.occurred_at,
                updated_at: input.occurred_at,
            },
        };

        let event = CustomerEvent::CustomerRegistered(CustomerRegistered {
            tenant_id: input.tenant_id,
            customer_id: id,
            name: input.name,
            email: input.email,
            occurred_at: input.occurred_at,
        });

        Ok((customer, event))
    }

    /// Trusted-source path: rebuild from stored props, skipping validation.
    pub fn reconstitute(props: CustomerProps) -> Self {
        Self { props }
    }

    /// Replace email and phone, with the same validation as registration.
    pub fn update_contact_info(
        &mut self,
        email: String,
        phone: String,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<CustomerEvent> {
        validate_email(&email)?;
        validate_phone(&phone)?;

        self.props.email = email.clone();
        self.props.phone = phone.clone();
        self.touch(occurred_at);

        Ok(CustomerEvent::CustomerContactUpdated(
            CustomerContactUpdated {
                tenant_id: self.props.tenant_id,
                customer_id: self.props.id,
                email,
                phone,
                occurred_at,
            },
        ))
    }

    pub fn update_address(&mut self, address: Address, occurred_at: DateTime<Utc>) -> CustomerEvent {
        self.props.address = Some(address.clone());
        self.touch(occurred_at);

        CustomerEvent::CustomerAddressUpdated(CustomerAddressUpdated {
            tenant_id: self.props.tenant_id,
            customer_id: self.props.id,
            address,
            occurred_at,
        })
    }

    /// Idempotent in state; still advances `updated_at`.
    pub fn activate(&mut self, occurred_at: DateTime<Utc>) -> CustomerEvent {
        self.props.is_active = true;
        self.touch(occurred_at);
        CustomerEvent::CustomerActivated(CustomerActivated {
            tenant_id: self.props.tenant_id,
            customer_id: self.props.id,
            occurred_at,
        })
    }

    /// Idempotent in state; still advances `updated_at`.
    pub fn deactivate(&mut self, occurred_at: DateTime<Utc>) -> CustomerEvent {
        self.props.is_active = false;
        self.touch(occurred_at);
        CustomerEvent::CustomerDeactivated(CustomerDeactivated {
            tenant_id: self.props.tenant_id,
            customer_id: self.props.id,
            occurred_at,
        })
    }

    fn touch(&mut self, occurred_at: DateTime<Utc>) {
        self.props.updated_at = occurred_at;
        self.props.version += 1;
    }

    pub fn props(&self) -> &CustomerProps {
        &self.props
    }

    pub fn id_typed(&self) -> CustomerId {
        self.props.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.props.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.props.name
    }

    pub fn email(&self) -> &str {
        &self.props.email
    }

    pub fn phone(&self) -> &str {
        &self.props.phone
    }

    pub fn document(&self) -> Option<&str> {
        self.props.document.as_deref()
    }

    pub fn address(&self) -> Option<&Address> {
        self.props.address.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.props.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.props.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.props.updated_at
    }
}

impl AggregateRoot for Customer {
    type Id = CustomerId;

    fn id(&self) -> &Self::Id {
        &self.props.id
    }

    fn version(&self) -> u64 {
        self.props.version
    }
}

/// Event: CustomerRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRegistered {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerContactUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContactUpdated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub email: String,
    pub phone: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerAddressUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAddressUpdated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub address: Address,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerActivated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CustomerDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDeactivated {
    pub tenant_id: TenantId,
    pub customer_id: CustomerId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerEvent {
    CustomerRegistered(CustomerRegistered),
    CustomerContactUpdated(CustomerContactUpdated),
    CustomerAddressUpdated(CustomerAddressUpdated),
    CustomerActivated(CustomerActivated),
    CustomerDeactivated(CustomerDeactivated),
}

impl Event for CustomerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CustomerEvent::CustomerRegistered(_) => "customers.customer.registered",
            CustomerEvent::CustomerContactUpdated(_) => "customers.customer.contact_updated",
            CustomerEvent::CustomerAddressUpdated(_) => "customers.customer.address_updated",
            CustomerEvent::CustomerActivated(_) => "customers.customer.activated",
            CustomerEvent::CustomerDeactivated(_) => "customers.customer.deactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CustomerEvent::CustomerRegistered(e) => e.occurred_at,
            CustomerEvent::CustomerContactUpdated(e) => e.occurred_at,
            CustomerEvent::CustomerAddressUpdated(e) => e.occurred_at,
            CustomerEvent::CustomerActivated(e) => e.occurred_at,
            CustomerEvent::CustomerDeactivated(e) => e.occurred_at,
        }
    }
}
