//! Recording publisher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::bus::{BusError, EventPublisher, EventSource, TicketEvent};

/// Event publisher that keeps everything it is given.
///
/// # Example
///
/// ```rust,ignore
/// use ticketflow_core::testing::RecordingPublisher;
///
/// let publisher = Arc::new(RecordingPublisher::new());
/// let service = IngressService::new(store, blobs, decoder, resolver, publisher.clone());
///
/// service.receive(inbound).await?;
///
/// let events = publisher.published().await;
/// assert_eq!(events[0].0, EventSource::EXTERNAL_EMAIL);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    /// Published events, in call order.
    events: Arc<RwLock<Vec<(EventSource, TicketEvent)>>>,
    /// If set, the next publish will fail with this error.
    next_error: Arc<RwLock<Option<BusError>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far.
    pub async fn published(&self) -> Vec<(EventSource, TicketEvent)> {
        self.events.read().await.clone()
    }

    /// Make the next publish fail.
    pub async fn fail_next(&self, error: BusError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, source: EventSource, event: TicketEvent) -> Result<(), BusError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.events.write().await.push((source, event));
        Ok(())
    }
}
