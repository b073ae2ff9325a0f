//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined
//! entirely by their attribute values. Two value objects with the same values
//! are considered equal.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// create a new one with the new values.
///
/// - **Value Object**: no identity (`FeeSchedule { boleto_fee: 349, .. }`)
/// - **Entity**: has identity (`Customer { id: CustomerId(...), .. }`)
///
/// The trait requires `Clone + PartialEq + Debug`: value objects are cheap to
/// copy, compared by their attribute values, and debuggable.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
