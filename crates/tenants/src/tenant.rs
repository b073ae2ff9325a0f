use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cobrado_billing::{DEFAULT_PLATFORM_FEE_BPS, platform_fee};
use cobrado_core::{AggregateRoot, DomainError, DomainResult, TenantId};
use cobrado_events::Event;

/// Raw state of a tenant profile.
///
/// Doubles as the trusted reconstitution input, the repository record, and
/// the transport projection (all public fields, verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProps {
    pub id: TenantId,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub business_type: Option<String>,
    pub gateway_customer_id: Option<String>,
    pub gateway_wallet_id: Option<String>,
    /// Platform fee retained on this tenant's invoices, in basis points.
    pub fee_percentage_bps: u32,
    pub is_active: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a new tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterTenant {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub business_type: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Aggregate root: Tenant (merchant profile).
///
/// The fee percentage is fixed at registration time; custom values only
/// enter through reconstitution from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    props: TenantProps,
}

impl Tenant {
    /// Validating factory: rejects malformed input before any state exists.
    pub fn register(input: RegisterTenant) -> DomainResult<(Self, TenantEvent)> {
        if !input.email.contains('@') {
            return Err(DomainError::validation("email must contain '@'"));
        }
        if input.name.chars().count() < 3 {
            return Err(DomainError::validation(
                "name must be at least 3 characters",
            ));
        }

        let id = TenantId::new();
        let tenant = Self {
            props: TenantProps {
                id,
                email: input.email.clone(),
                name: input.name.clone(),
                phone: input.phone,
                document: input.document,
                business_type: input.business_type,
                gateway_customer_id: None,
                gateway_wallet_id: None,
                fee_percentage_bps: DEFAULT_PLATFORM_FEE_BPS,
                is_active: true,
                version: 1,
                created_at: input.occurred_at,
                updated_at: input.occurred_at,
            },
        };

        let event = TenantEvent::TenantRegistered(TenantRegistered {
            tenant_id: id,
            email: input.email,
            name: input.name,
            fee_percentage_bps: DEFAULT_PLATFORM_FEE_BPS,
            occurred_at: input.occurred_at,
        });

        Ok((tenant, event))
    }

    /// Trusted-source path: rebuild from stored props, skipping validation.
    pub fn reconstitute(props: TenantProps) -> Self {
        Self { props }
    }

    /// Platform fee for `amount` cents at this tenant's rate.
    ///
    /// Single source of truth for platform-fee math; invoice issuance
    /// computes through the same primitive.
    pub fn calculate_platform_fee(&self, amount: u64) -> DomainResult<u64> {
        platform_fee(amount, self.props.fee_percentage_bps)
    }

    /// Update profile details; `None` keeps the existing value.
    pub fn update_details(
        &mut self,
        name: Option<String>,
        phone: Option<String>,
        business_type: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<TenantEvent> {
        let new_name = name.unwrap_or_else(|| self.props.name.clone());
        if new_name.chars().count() < 3 {
            return Err(DomainError::validation(
                "name must be at least 3 characters",
            ));
        }

        self.props.name = new_name.clone();
        if let Some(phone) = phone {
            self.props.phone = Some(phone);
        }
        if let Some(business_type) = business_type {
            self.props.business_type = Some(business_type);
        }
        self.touch(occurred_at);

        Ok(TenantEvent::TenantDetailsUpdated(TenantDetailsUpdated {
            tenant_id: self.props.id,
            name: new_name,
            phone: self.props.phone.clone(),
            business_type: self.props.business_type.clone(),
            occurred_at,
        }))
    }

    /// Attach the external gateway account references.
    pub fn link_gateway_account(
        &mut self,
        customer_id: String,
        wallet_id: String,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<TenantEvent> {
        if customer_id.is_empty() || wallet_id.is_empty() {
            return Err(DomainError::validation(
                "gateway customer and wallet ids are required",
            ));
        }

        self.props.gateway_customer_id = Some(customer_id.clone());
        self.props.gateway_wallet_id = Some(wallet_id.clone());
        self.touch(occurred_at);

        Ok(TenantEvent::GatewayAccountLinked(GatewayAccountLinked {
            tenant_id: self.props.id,
            gateway_customer_id: customer_id,
            gateway_wallet_id: wallet_id,
            occurred_at,
        }))
    }

    /// Idempotent in state; still advances `updated_at`.
    pub fn activate(&mut self, occurred_at: DateTime<Utc>) -> TenantEvent {
        self.props.is_active = true;
        self.touch(occurred_at);
        TenantEvent::TenantActivated(TenantActivated {
            tenant_id: self.props.id,
            occurred_at,
        })
    }

    /// Idempotent in state; still advances `updated_at`.
    pub fn deactivate(&mut self, occurred_at: DateTime<Utc>) -> TenantEvent {
        self.props.is_active = false;
        self.touch(occurred_at);
        TenantEvent::TenantDeactivated(TenantDeactivated {
            tenant_id: self.props.id,
            occurred_at,
        })
    }

    fn touch(&mut self, occurred_at: DateTime<Utc>) {
        self.props.updated_at = occurred_at;
        self.props.version += 1;
    }

    pub fn props(&self) -> &TenantProps {
        &self.props
    }

    pub fn id_typed(&self) -> TenantId {
        self.props.id
    }

    pub fn email(&self) -> &str {
        &self.props.email
    }

    pub fn name(&self) -> &str {
        &self.props.name
    }

    pub fn phone(&self) -> Option<&str> {
        self.props.phone.as_deref()
    }

    pub fn document(&self) -> Option<&str> {
        self.props.document.as_deref()
    }

    pub fn business_type(&self) -> Option<&str> {
        self.props.business_type.as_deref()
    }

    pub fn gateway_customer_id(&self) -> Option<&str> {
        self.props.gateway_customer_id.as_deref()
    }

    pub fn gateway_wallet_id(&self) -> Option<&str> {
        self.props.gateway_wallet_id.as_deref()
    }

    pub fn fee_percentage_bps(&self) -> u32 {
        self.props.fee_percentage_bps
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

impl AggregateRoot for Tenant {
    type Id = TenantId;

    fn id(&self) -> &Self::Id {
        &self.props.id
    }

    fn version(&self) -> u64 {
        self.props.version
    }
}

/// Event: TenantRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRegistered {
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    pub fee_percentage_bps: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TenantDetailsUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDetailsUpdated {
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: Option<String>,
    pub business_type: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: GatewayAccountLinked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAccountLinked {
    pub tenant_id: TenantId,
    pub gateway_customer_id: String,
    pub gateway_wallet_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TenantActivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantActivated {
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TenantDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantDeactivated {
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantEvent {
    TenantRegistered(TenantRegistered),
    TenantDetailsUpdated(TenantDetailsUpdated),
    GatewayAccountLinked(GatewayAccountLinked),
    TenantActivated(TenantActivated),
    TenantDeactivated(TenantDeactivated),
}

impl Event for TenantEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TenantEvent::TenantRegistered(_) => "tenants.tenant.registered",
            TenantEvent::TenantDetailsUpdated(_) => "tenants.tenant.details_updated",
            TenantEvent::GatewayAccountLinked(_) => "tenants.tenant.gateway_account_linked",
            TenantEvent::TenantActivated(_) => "tenants.tenant.activated",
            TenantEvent::TenantDeactivated(_) => "tenants.tenant.deactivated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TenantEvent::TenantRegistered(e) => e.occurred_at,
            TenantEvent::TenantDetailsUpdated(e) => e.occurred_at,
            TenantEvent::GatewayAccountLinked(e) => e.occurred_at,
            TenantEvent::TenantActivated(e) => e.occurred_at,
            TenantEvent::TenantDeactivated(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn register_input() -> RegisterTenant {
        RegisterTenant {
            email: "merchant@example.com".to_string(),
            name: "Acme Cobros".to_string(),
            phone: Some("+5511999990000".to_string()),
            document: Some("12345678000190".to_string()),
            business_type: Some("services".to_string()),
            occurred_at: test_time(),
        }
    }

    #[test]
    fn register_emits_tenant_registered_with_default_fee() {
        let (tenant, event) = Tenant::register(register_input()).unwrap();

        assert_eq!(tenant.fee_percentage_bps(), DEFAULT_PLATFORM_FEE_BPS);
        assert!(tenant.is_active());
        assert_eq!(tenant.version(), 1);

        match event {
            TenantEvent::TenantRegistered(e) => {
                assert_eq!(e.tenant_id, tenant.id_typed());
                assert_eq!(e.email, "merchant@example.com");
                assert_eq!(e.fee_percentage_bps, DEFAULT_PLATFORM_FEE_BPS);
            }
            _ => panic!("Expected TenantRegistered event"),
        }
    }

    #[test]
    fn register_rejects_email_without_at_sign() {
        let mut input = register_input();
        input.email = "not-an-email".to_string();

        let err = Tenant::register(input).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_rejects_short_name() {
        let mut input = register_input();
        input.name = "ab".to_string();

        let err = Tenant::register(input).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn calculate_platform_fee_uses_tenant_rate() {
        let (tenant, _) = Tenant::register(register_input()).unwrap();

        // 1.5% of R$100.00
        assert_eq!(tenant.calculate_platform_fee(10_000).unwrap(), 150);
    }

    #[test]
    fn calculate_platform_fee_rejects_zero_amount() {
        let (tenant, _) = Tenant::register(register_input()).unwrap();
        let err = tenant.calculate_platform_fee(0).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reconstitute_preserves_custom_fee_percentage() {
        let (tenant, _) = Tenant::register(register_input()).unwrap();
        let mut props = tenant.props().clone();
        props.fee_percentage_bps = 250;

        let restored = Tenant::reconstitute(props);
        assert_eq!(restored.fee_percentage_bps(), 250);
        assert_eq!(restored.calculate_platform_fee(10_000).unwrap(), 250);
    }

    #[test]
    fn deactivate_twice_is_idempotent_in_state_but_touches_timestamp() {
        let (mut tenant, _) = Tenant::register(register_input()).unwrap();
        let t1 = tenant.updated_at() + Duration::seconds(10);
        let t2 = t1 + Duration::seconds(10);

        tenant.deactivate(t1);
        assert!(!tenant.is_active());

        tenant.deactivate(t2);
        assert!(!tenant.is_active());
        assert_eq!(tenant.updated_at(), t2);
    }

    #[test]
    fn link_gateway_account_requires_both_ids() {
        let (mut tenant, _) = Tenant::register(register_input()).unwrap();

        let err = tenant
            .link_gateway_account(String::new(), "wallet-1".to_string(), test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        tenant
            .link_gateway_account("cus-1".to_string(), "wal-1".to_string(), test_time())
            .unwrap();
        assert_eq!(tenant.gateway_customer_id(), Some("cus-1"));
        assert_eq!(tenant.gateway_wallet_id(), Some("wal-1"));
    }

    #[test]
    fn update_details_merges_missing_fields() {
        let (mut tenant, _) = Tenant::register(register_input()).unwrap();

        tenant
            .update_details(Some("New Name".to_string()), None, None, test_time())
            .unwrap();
        assert_eq!(tenant.name(), "New Name");
        assert_eq!(tenant.phone(), Some("+5511999990000"));

        let err = tenant
            .update_details(Some("x".to_string()), None, None, test_time())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn version_increments_on_each_accepted_mutation() {
        let (mut tenant, _) = Tenant::register(register_input()).unwrap();
        assert_eq!(tenant.version(), 1);

        tenant.deactivate(test_time());
        assert_eq!(tenant.version(), 2);

        tenant.activate(test_time());
        assert_eq!(tenant.version(), 3);
    }
}
