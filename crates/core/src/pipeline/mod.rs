//! The ticket pipeline: ingress, the bus consumers and their routing.

mod error;
mod ingress;
mod notification;
mod persistence;
mod routing;
mod tickets;

pub use error::PipelineError;
pub use ingress::{InboundEmail, IngressOutcome, IngressService, UNKNOWN_SENDER};
pub use notification::{notification_body, reply_subject, CommentNotifier};
pub use persistence::CommentPersister;
pub use routing::{register_routes, PipelineHandlers, GENERATE_RESPONSE, NOTIFY_OWNER, PERSIST_COMMENT};
pub use tickets::{NewComment, TicketService, TicketView};
