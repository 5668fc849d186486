//! In-process event bus.
//!
//! Publishers hold a cloneable [`EventBus`]; the [`EventRouter`] owns the
//! subscriptions and delivers each event to every subscription whose topic and
//! source filter match. Delivery is at-least-once per subscription with no
//! ordering guarantee across events.

mod events;
mod handle;
mod router;
mod subscription;

pub use events::{BusEnvelope, Channel, EventSource, TicketEvent, Topic};
pub use handle::{EventBus, EventPublisher};
pub use router::EventRouter;
pub use subscription::{Delivery, EventHandler, SourceFilter, Subscription};

use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("Event bus buffer is full")]
    Full,

    #[error("Handler failed: {0}")]
    Handler(String),
}

/// Create a publisher handle and the router that consumes it.
///
/// Register subscriptions on the router, then spawn `router.run(shutdown)`.
/// `buffer_size` bounds the publish channel; subscription queues are drained
/// from it without limit so publishers only wait on the router itself.
pub fn create_event_bus(buffer_size: usize) -> (EventBus, EventRouter) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    (EventBus::new(tx), EventRouter::new(rx))
}
