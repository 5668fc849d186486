use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{BusEnvelope, Delivery, EventHandler, SourceFilter, Subscription, Topic};

/// Dispatcher that fans bus events out to subscriptions.
///
/// Each subscription gets its own queue and consumer task. Subscription queues
/// are unbounded so the router never waits on a slow handler: the backlog of a
/// serial subscription sits in its queue while the bus keeps flowing, and a
/// handler that publishes back onto the bus cannot deadlock against it.
pub struct EventRouter {
    rx: mpsc::Receiver<BusEnvelope>,
    subscriptions: Vec<Subscription>,
    handler_timeout: Duration,
}

struct Lane {
    name: String,
    topic: Topic,
    filter: SourceFilter,
    tx: mpsc::UnboundedSender<BusEnvelope>,
}

impl EventRouter {
    pub fn new(rx: mpsc::Receiver<BusEnvelope>) -> Self {
        Self {
            rx,
            subscriptions: Vec::new(),
            handler_timeout: Duration::from_secs(60),
        }
    }

    /// Default wall-clock budget of a single handler invocation.
    ///
    /// Subscriptions built with [`Subscription::with_timeout`] keep their own.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn subscribe(&mut self, subscription: Subscription) {
        info!(
            subscription = %subscription.name,
            topic = %subscription.topic,
            filter = ?subscription.filter,
            delivery = ?subscription.delivery,
            timeout_secs = subscription.timeout.map(|t| t.as_secs_f64()),
            "Registered subscription"
        );
        self.subscriptions.push(subscription);
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Names of the subscriptions `envelope` would be delivered to.
    pub fn matching(&self, envelope: &BusEnvelope) -> Vec<&str> {
        self.subscriptions
            .iter()
            .filter(|s| s.accepts(envelope))
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Run the router until every publisher is gone or `shutdown` fires.
    ///
    /// On shutdown, serial subscriptions finish their in-flight invocation and
    /// discard what is still queued for them. Events published meanwhile (such
    /// as a reply from that last invocation) are still routed. The bus then
    /// stops accepting events, the remaining queues are delivered, and the call
    /// returns once all consumers have finished.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            subscriptions = self.subscriptions.len(),
            "Event router started"
        );

        let (stop_tx, _) = watch::channel(false);
        let mut lanes = Vec::with_capacity(self.subscriptions.len());
        let mut serial = JoinSet::new();
        let mut concurrent = JoinSet::new();
        for subscription in std::mem::take(&mut self.subscriptions) {
            let (tx, rx) = mpsc::unbounded_channel();
            lanes.push(Lane {
                name: subscription.name.clone(),
                topic: subscription.topic,
                filter: subscription.filter,
                tx,
            });
            let timeout = subscription.timeout.unwrap_or(self.handler_timeout);
            match subscription.delivery {
                Delivery::Serial => {
                    serial.spawn(consume_serial(
                        subscription.name,
                        subscription.handler,
                        rx,
                        timeout,
                        stop_tx.subscribe(),
                    ));
                }
                Delivery::Concurrent => {
                    concurrent.spawn(consume_concurrent(
                        subscription.name,
                        subscription.handler,
                        rx,
                        timeout,
                    ));
                }
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Event router received shutdown signal");
                    break;
                }
                maybe = self.rx.recv() => match maybe {
                    Some(envelope) => dispatch(&lanes, envelope),
                    None => break,
                }
            }
        }

        // Keep routing while serial handlers finish what they started.
        let _ = stop_tx.send(true);
        loop {
            tokio::select! {
                joined = serial.join_next() => {
                    if joined.is_none() {
                        break;
                    }
                }
                Some(envelope) = self.rx.recv() => dispatch(&lanes, envelope),
            }
        }

        self.rx.close();
        while let Some(envelope) = self.rx.recv().await {
            dispatch(&lanes, envelope);
        }
        drop(lanes);

        while concurrent.join_next().await.is_some() {}
        info!("Event router stopped");
    }
}

fn dispatch(lanes: &[Lane], envelope: BusEnvelope) {
    let mut delivered = 0;
    for lane in lanes {
        if lane.topic != envelope.topic() || !lane.filter.matches(&envelope.source) {
            continue;
        }
        if lane.tx.send(envelope.clone()).is_err() {
            warn!(subscription = %lane.name, event_id = %envelope.id, "Subscription queue closed");
            continue;
        }
        delivered += 1;
    }

    if delivered == 0 {
        debug!(
            event_id = %envelope.id,
            topic = %envelope.topic(),
            source = %envelope.source,
            "No subscription matched event"
        );
    }
}

async fn consume_serial(
    name: String,
    handler: Arc<dyn EventHandler>,
    mut rx: mpsc::UnboundedReceiver<BusEnvelope>,
    timeout: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            maybe = rx.recv() => match maybe {
                Some(envelope) => invoke(&name, handler.as_ref(), envelope, timeout).await,
                None => break,
            }
        }
    }

    rx.close();
    let mut discarded = 0;
    while let Ok(envelope) = rx.try_recv() {
        debug!(subscription = %name, event_id = %envelope.id, "Discarding queued event");
        discarded += 1;
    }
    if discarded > 0 {
        warn!(subscription = %name, discarded, "Serial subscription stopped with queued events");
    }
    debug!(subscription = %name, "Subscription consumer stopped");
}

async fn consume_concurrent(
    name: String,
    handler: Arc<dyn EventHandler>,
    mut rx: mpsc::UnboundedReceiver<BusEnvelope>,
    timeout: Duration,
) {
    let mut in_flight = JoinSet::new();

    while let Some(envelope) = rx.recv().await {
        let name = name.clone();
        let handler = Arc::clone(&handler);
        in_flight.spawn(async move {
            invoke(&name, handler.as_ref(), envelope, timeout).await;
        });
        // Reap finished invocations so the set stays small.
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    debug!(subscription = %name, "Subscription consumer stopped");
}

async fn invoke(name: &str, handler: &dyn EventHandler, envelope: BusEnvelope, timeout: Duration) {
    match tokio::time::timeout(timeout, handler.handle(&envelope)).await {
        Ok(Ok(())) => {
            debug!(subscription = name, event_id = %envelope.id, "Handled event");
        }
        Ok(Err(e)) => {
            error!(
                subscription = name,
                event_id = %envelope.id,
                ticket_id = envelope.event.ticket_id(),
                error = %e,
                "Event handler failed"
            );
        }
        Err(_) => {
            error!(
                subscription = name,
                event_id = %envelope.id,
                ticket_id = envelope.event.ticket_id(),
                timeout_secs = timeout.as_secs_f64(),
                "Event handler timed out"
            );
        }
    }
}
