pub mod auth;
pub mod blob;
pub mod bus;
pub mod config;
pub mod credentials;
pub mod mail;
pub mod outbound;
pub mod pipeline;
pub mod responder;
pub mod testing;
pub mod ticket;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator, SharedSecret,
};
pub use blob::{BlobError, BlobStore, SqliteBlobStore, StoredMessage};
pub use bus::{
    create_event_bus, BusEnvelope, BusError, Channel, Delivery, EventBus, EventHandler,
    EventPublisher, EventRouter, EventSource, SourceFilter, Subscription, TicketEvent, Topic,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
};
pub use credentials::{
    create_credential_provider, CachedCredentialProvider, CredentialError, CredentialProvider,
};
pub use mail::{latest_message, LatestMessage, MailDecoder, MailError, MimeMailDecoder};
pub use outbound::{create_transport, MailTransport, OutboundMail, TransportError};
pub use pipeline::{
    register_routes, CommentNotifier, CommentPersister, InboundEmail, IngressOutcome,
    IngressService, NewComment, PipelineError, PipelineHandlers, TicketService, TicketView,
};
pub use responder::{
    create_chat_client, ChatClient, LlmError, ModelSelection, ResponderSettings, ResponseWorker,
};
pub use ticket::{
    Comment, CommentOrigin, ConversationStore, IdentityResolver, MessageRef,
    SqliteConversationStore, TicketError, TicketHeader, TicketStatus,
};
