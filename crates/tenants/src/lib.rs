//! Tenant aggregate: a merchant collecting payments through the platform.

mod tenant;

pub use tenant::{
    GatewayAccountLinked, RegisterTenant, Tenant, TenantActivated, TenantDeactivated,
    TenantDetailsUpdated, TenantEvent, TenantProps, TenantRegistered,
};
