//! Domain events: trait, tenant-scoped envelope, and pub/sub abstractions.
//!
//! Every accepted state change in the billing domain produces a typed event.
//! Events are **immutable facts**, versioned for schema evolution, and are
//! published on a bus *after* the owning aggregate has been persisted.

mod bus;
mod envelope;
mod event;
mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
