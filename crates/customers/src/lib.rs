//! Customer aggregate: an end payer, scoped to exactly one tenant.

mod customer;

pub use customer::{
    Address, Customer, CustomerActivated, CustomerAddressUpdated, CustomerContactUpdated,
    CustomerDeactivated, CustomerEvent, CustomerId, CustomerProps, CustomerRegistered,
    RegisterCustomer,
};
