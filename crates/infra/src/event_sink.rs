//! Distribution of committed domain events.
//!
//! Use cases hand every accepted change here *after* persistence. Delivery
//! is best-effort at-least-once: a publish failure is logged and swallowed,
//! never surfaced as a domain error, because consumers can always rebuild
//! from repository state.

use serde::Serialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use cobrado_core::{AggregateId, TenantId};
use cobrado_events::{Event, EventBus, EventEnvelope};

/// Sink for committed domain events.
pub trait EventSink: Send + Sync {
    fn publish(&self, envelope: EventEnvelope<JsonValue>);
}

/// Sink backed by an [`EventBus`].
pub struct BusSink<B> {
    bus: B,
}

impl<B> BusSink<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }
}

impl<B> EventSink for BusSink<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn publish(&self, envelope: EventEnvelope<JsonValue>) {
        if let Err(e) = self.bus.publish(envelope) {
            tracing::warn!(error = ?e, "domain event publication failed");
        }
    }
}

/// Sink that drops everything; for callers with no consumers wired up.
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _envelope: EventEnvelope<JsonValue>) {}
}

/// Wrap a typed committed event into a tenant-scoped envelope.
///
/// `sequence_number` is the owning aggregate's version after the change.
pub fn envelope_for<E>(
    tenant_id: TenantId,
    aggregate_id: AggregateId,
    aggregate_type: &str,
    sequence_number: u64,
    event: &E,
) -> EventEnvelope<JsonValue>
where
    E: Event + Serialize,
{
    let payload = match serde_json::to_value(event) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, event_type = event.event_type(), "event serialization failed");
            JsonValue::Null
        }
    };

    EventEnvelope::new(
        Uuid::now_v7(),
        tenant_id,
        aggregate_id,
        aggregate_type,
        sequence_number,
        payload,
    )
}
