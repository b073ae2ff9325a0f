use std::sync::Arc;

use chrono::Utc;

use cobrado_core::{AggregateId, AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_tenants::{RegisterTenant, Tenant};

use crate::event_sink::{EventSink, envelope_for};
use crate::repository::TenantRepository;

const AGGREGATE_TYPE: &str = "tenants.tenant";

fn aggregate_id(id: TenantId) -> AggregateId {
    AggregateId::from_uuid(*id.as_uuid())
}

async fn load(tenants: &dyn TenantRepository, id: TenantId) -> DomainResult<Tenant> {
    tenants
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Tenant", id))
}

#[derive(Debug, Clone)]
pub struct CreateTenantInput {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub business_type: Option<String>,
}

/// Register a new tenant, enforcing email/document uniqueness.
pub struct CreateTenant {
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
}

impl CreateTenant {
    pub fn new(tenants: Arc<dyn TenantRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { tenants, events }
    }

    pub async fn execute(&self, input: CreateTenantInput) -> DomainResult<Tenant> {
        if self.tenants.find_by_email(&input.email).await?.is_some() {
            return Err(DomainError::conflict("email already registered"));
        }
        if let Some(document) = &input.document {
            if self.tenants.find_by_document(document).await?.is_some() {
                return Err(DomainError::conflict("document already registered"));
            }
        }

        let (tenant, event) = Tenant::register(RegisterTenant {
            email: input.email,
            name: input.name,
            phone: input.phone,
            document: input.document,
            business_type: input.business_type,
            occurred_at: Utc::now(),
        })?;

        self.tenants.create(&tenant).await?;
        self.events.publish(envelope_for(
            tenant.id_typed(),
            aggregate_id(tenant.id_typed()),
            AGGREGATE_TYPE,
            tenant.version(),
            &event,
        ));
        tracing::info!(tenant_id = %tenant.id_typed(), "tenant registered");

        Ok(tenant)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateTenantInput {
    pub tenant_id: TenantId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub business_type: Option<String>,
}

/// Update a tenant's profile details.
pub struct UpdateTenant {
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
}

impl UpdateTenant {
    pub fn new(tenants: Arc<dyn TenantRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { tenants, events }
    }

    pub async fn execute(&self, input: UpdateTenantInput) -> DomainResult<Tenant> {
        let mut tenant = load(self.tenants.as_ref(), input.tenant_id).await?;
        let event =
            tenant.update_details(input.name, input.phone, input.business_type, Utc::now())?;

        self.tenants.update(&tenant).await?;
        self.events.publish(envelope_for(
            tenant.id_typed(),
            aggregate_id(tenant.id_typed()),
            AGGREGATE_TYPE,
            tenant.version(),
            &event,
        ));

        Ok(tenant)
    }
}

/// Attach external gateway account references to a tenant.
pub struct LinkGatewayAccount {
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
}

impl LinkGatewayAccount {
    pub fn new(tenants: Arc<dyn TenantRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { tenants, events }
    }

    pub async fn execute(
        &self,
        tenant_id: TenantId,
        gateway_customer_id: String,
        gateway_wallet_id: String,
    ) -> DomainResult<Tenant> {
        let mut tenant = load(self.tenants.as_ref(), tenant_id).await?;
        let event =
            tenant.link_gateway_account(gateway_customer_id, gateway_wallet_id, Utc::now())?;

        self.tenants.update(&tenant).await?;
        self.events.publish(envelope_for(
            tenant.id_typed(),
            aggregate_id(tenant.id_typed()),
            AGGREGATE_TYPE,
            tenant.version(),
            &event,
        ));

        Ok(tenant)
    }
}

/// Re-enable a tenant. Idempotent in state.
pub struct ActivateTenant {
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
}

impl ActivateTenant {
    pub fn new(tenants: Arc<dyn TenantRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { tenants, events }
    }

    pub async fn execute(&self, tenant_id: TenantId) -> DomainResult<Tenant> {
        let mut tenant = load(self.tenants.as_ref(), tenant_id).await?;
        let event = tenant.activate(Utc::now());

        self.tenants.update(&tenant).await?;
        self.events.publish(envelope_for(
            tenant.id_typed(),
            aggregate_id(tenant.id_typed()),
            AGGREGATE_TYPE,
            tenant.version(),
            &event,
        ));

        Ok(tenant)
    }
}

/// Disable a tenant. Idempotent in state.
pub struct DeactivateTenant {
    tenants: Arc<dyn TenantRepository>,
    events: Arc<dyn EventSink>,
}

impl DeactivateTenant {
    pub fn new(tenants: Arc<dyn TenantRepository>, events: Arc<dyn EventSink>) -> Self {
        Self { tenants, events }
    }

    pub async fn execute(&self, tenant_id: TenantId) -> DomainResult<Tenant> {
        let mut tenant = load(self.tenants.as_ref(), tenant_id).await?;
        let event = tenant.deactivate(Utc::now());

        self.tenants.update(&tenant).await?;
        self.events.publish(envelope_for(
            tenant.id_typed(),
            aggregate_id(tenant.id_typed()),
            AGGREGATE_TYPE,
            tenant.version(),
            &event,
        ));
        tracing::info!(tenant_id = %tenant.id_typed(), "tenant deactivated");

        Ok(tenant)
    }
}
