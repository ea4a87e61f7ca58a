use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are immutable facts, versioned for schema evolution and appended to
/// a stream; they are never updated in place.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "stock.shipment_in.received").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
