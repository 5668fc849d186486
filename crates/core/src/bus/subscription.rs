use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{BusEnvelope, BusError, EventSource, Topic};
use crate::ticket::CommentOrigin;

/// Predicate over the provenance of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFilter {
    Any,
    Origin(CommentOrigin),
    Exact(EventSource),
}

impl SourceFilter {
    pub fn matches(&self, source: &EventSource) -> bool {
        match self {
            SourceFilter::Any => true,
            SourceFilter::Origin(origin) => source.origin == *origin,
            SourceFilter::Exact(expected) => source == expected,
        }
    }
}

/// How a subscription's handler is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Every event gets its own task.
    Concurrent,
    /// One invocation in flight; the next event waits for it.
    Serial,
}

/// Consumer of routed events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, envelope: &BusEnvelope) -> Result<(), BusError>;
}

/// A topic plus source predicate bound to a handler.
#[derive(Clone)]
pub struct Subscription {
    pub name: String,
    pub topic: Topic,
    pub filter: SourceFilter,
    pub delivery: Delivery,
    /// Per-invocation budget; the router default applies when unset.
    pub timeout: Option<Duration>,
    pub handler: Arc<dyn EventHandler>,
}

impl Subscription {
    /// Concurrent subscription to every source on `topic`.
    pub fn new(name: impl Into<String>, topic: Topic, handler: Arc<dyn EventHandler>) -> Self {
        Self {
            name: name.into(),
            topic,
            filter: SourceFilter::Any,
            delivery: Delivery::Concurrent,
            timeout: None,
            handler,
        }
    }

    pub fn with_filter(mut self, filter: SourceFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn serial(mut self) -> Self {
        self.delivery = Delivery::Serial;
        self
    }

    pub fn accepts(&self, envelope: &BusEnvelope) -> bool {
        envelope.topic() == self.topic && self.filter.matches(&envelope.source)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("topic", &self.topic)
            .field("filter", &self.filter)
            .field("delivery", &self.delivery)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Channel, TicketEvent};

    struct Noop;

    #[async_trait]
    impl EventHandler for Noop {
        async fn handle(&self, _envelope: &BusEnvelope) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn comment_from(source: EventSource) -> BusEnvelope {
        BusEnvelope::new(
            source,
            TicketEvent::CommentAdded {
                ticket_id: "abc12345".to_string(),
                comment_ref: "abc12345.1".to_string(),
                from: "a@b.c".to_string(),
                message: "hi".to_string(),
            },
        )
    }

    #[test]
    fn test_filter_matching() {
        let internal = EventSource::new(CommentOrigin::Internal, Channel::Api);

        assert!(SourceFilter::Any.matches(&internal));
        assert!(SourceFilter::Origin(CommentOrigin::External).matches(&EventSource::EXTERNAL_AI));
        assert!(!SourceFilter::Origin(CommentOrigin::External).matches(&internal));
        assert!(SourceFilter::Exact(EventSource::EXTERNAL_EMAIL).matches(&EventSource::EXTERNAL_EMAIL));
        assert!(!SourceFilter::Exact(EventSource::EXTERNAL_EMAIL).matches(&EventSource::EXTERNAL_API));
    }

    #[test]
    fn test_subscription_accepts_topic_and_source() {
        let sub = Subscription::new("notify", Topic::CommentAdd, Arc::new(Noop))
            .with_filter(SourceFilter::Origin(CommentOrigin::External));

        assert!(sub.accepts(&comment_from(EventSource::EXTERNAL_EMAIL)));
        assert!(!sub.accepts(&comment_from(EventSource::INTERNAL_API)));

        let request = BusEnvelope::new(
            EventSource::EXTERNAL_EMAIL,
            TicketEvent::ResponseRequested {
                ticket_id: "abc12345".to_string(),
                message_ref: "abc12345.1".to_string(),
            },
        );
        assert!(!sub.accepts(&request));
    }

    #[test]
    fn test_builder_defaults() {
        let sub = Subscription::new("persist", Topic::CommentAdd, Arc::new(Noop));
        assert_eq!(sub.delivery, Delivery::Concurrent);
        assert_eq!(sub.filter, SourceFilter::Any);
        assert_eq!(sub.timeout, None);

        let sub = sub.serial().with_timeout(Duration::from_secs(600));
        assert_eq!(sub.delivery, Delivery::Serial);
        assert_eq!(sub.timeout, Some(Duration::from_secs(600)));
    }
}
