//! Subscription table of the ticket pipeline.

use std::sync::Arc;
use std::time::Duration;

use crate::bus::{EventHandler, EventRouter, EventSource, SourceFilter, Subscription, Topic};
use crate::ticket::CommentOrigin;

pub const PERSIST_COMMENT: &str = "persist-comment";
pub const NOTIFY_OWNER: &str = "notify-owner";
pub const GENERATE_RESPONSE: &str = "generate-response";

/// Consumers wired into the router at startup.
pub struct PipelineHandlers {
    pub persistence: Arc<dyn EventHandler>,
    pub notification: Arc<dyn EventHandler>,
    /// `None` when the responder is disabled.
    pub responder: Option<Arc<dyn EventHandler>>,
    /// Budget of one response generation, overriding the router default.
    pub responder_timeout: Duration,
}

/// Register the fixed routing policy.
///
/// - every `comment.add` is persisted
/// - only external `comment.add` notifies the ticket owner
/// - `response.generate` from inbound email feeds the responder, one at a time
pub fn register_routes(router: &mut EventRouter, handlers: PipelineHandlers) {
    router.subscribe(Subscription::new(
        PERSIST_COMMENT,
        Topic::CommentAdd,
        handlers.persistence,
    ));

    router.subscribe(
        Subscription::new(NOTIFY_OWNER, Topic::CommentAdd, handlers.notification)
            .with_filter(SourceFilter::Origin(CommentOrigin::External)),
    );

    if let Some(responder) = handlers.responder {
        router.subscribe(
            Subscription::new(GENERATE_RESPONSE, Topic::ResponseGenerate, responder)
                .with_filter(SourceFilter::Exact(EventSource::EXTERNAL_EMAIL))
                .with_timeout(handlers.responder_timeout)
                .serial(),
        );
    }
}
