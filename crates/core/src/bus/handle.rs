use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{BusEnvelope, BusError, EventSource, TicketEvent};

/// Anything that can put events on the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, source: EventSource, event: TicketEvent) -> Result<(), BusError>;
}

/// Handle for publishing events to the router
///
/// This is cheaply cloneable and can be shared across tasks.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<BusEnvelope>,
}

impl EventBus {
    pub fn new(tx: mpsc::Sender<BusEnvelope>) -> Self {
        Self { tx }
    }

    /// Publish without waiting for buffer space.
    pub fn try_publish(&self, source: EventSource, event: TicketEvent) -> Result<(), BusError> {
        self.tx
            .try_send(BusEnvelope::new(source, event))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => BusError::Full,
                mpsc::error::TrySendError::Closed(_) => BusError::Closed,
            })
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, source: EventSource, event: TicketEvent) -> Result<(), BusError> {
        let envelope = BusEnvelope::new(source, event);
        tracing::debug!(
            event_id = %envelope.id,
            topic = %envelope.topic(),
            source = %envelope.source,
            ticket_id = envelope.event.ticket_id(),
            "Publishing event"
        );
        self.tx.send(envelope).await.map_err(|_| BusError::Closed)
    }
}
