use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ticket::CommentOrigin;

/// Routing key of a bus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "comment.add")]
    CommentAdd,
    #[serde(rename = "response.generate")]
    ResponseGenerate,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CommentAdd => "comment.add",
            Topic::ResponseGenerate => "response.generate",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry point that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Api,
    Ai,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Api => "api",
            Channel::Ai => "ai",
        }
    }
}

/// Provenance tag of an event, rendered as `<origin>.<channel>`.
///
/// The origin decides visibility: internal events never reach the ticket owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EventSource {
    pub origin: CommentOrigin,
    pub channel: Channel,
}

impl EventSource {
    pub const EXTERNAL_EMAIL: EventSource = EventSource::new(CommentOrigin::External, Channel::Email);
    pub const EXTERNAL_AI: EventSource = EventSource::new(CommentOrigin::External, Channel::Ai);
    pub const EXTERNAL_API: EventSource = EventSource::new(CommentOrigin::External, Channel::Api);
    pub const INTERNAL_API: EventSource = EventSource::new(CommentOrigin::Internal, Channel::Api);

    pub const fn new(origin: CommentOrigin, channel: Channel) -> Self {
        Self { origin, channel }
    }

    pub fn is_external(&self) -> bool {
        self.origin == CommentOrigin::External
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.origin, self.channel.as_str())
    }
}

impl FromStr for EventSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (origin, channel) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid event source: {}", s))?;
        let origin = origin.parse::<CommentOrigin>()?;
        let channel = match channel {
            "email" => Channel::Email,
            "api" => Channel::Api,
            "ai" => Channel::Ai,
            other => return Err(format!("unknown event channel: {}", other)),
        };
        Ok(Self { origin, channel })
    }
}

impl From<EventSource> for String {
    fn from(source: EventSource) -> Self {
        source.to_string()
    }
}

impl TryFrom<String> for EventSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Payload of a bus event. The variant fixes the topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TicketEvent {
    /// A comment should be recorded on a ticket.
    CommentAdded {
        ticket_id: String,
        /// Becomes the comment's sort key.
        comment_ref: String,
        from: String,
        message: String,
    },
    /// An AI reply to the referenced inbound message is wanted.
    ResponseRequested {
        ticket_id: String,
        message_ref: String,
    },
}

impl TicketEvent {
    pub fn topic(&self) -> Topic {
        match self {
            TicketEvent::CommentAdded { .. } => Topic::CommentAdd,
            TicketEvent::ResponseRequested { .. } => Topic::ResponseGenerate,
        }
    }

    pub fn ticket_id(&self) -> &str {
        match self {
            TicketEvent::CommentAdded { ticket_id, .. } => ticket_id,
            TicketEvent::ResponseRequested { ticket_id, .. } => ticket_id,
        }
    }
}

/// An event in flight, with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEnvelope {
    pub id: Uuid,
    pub source: EventSource,
    pub published_at: DateTime<Utc>,
    pub event: TicketEvent,
}

impl BusEnvelope {
    pub fn new(source: EventSource, event: TicketEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            published_at: Utc::now(),
            event,
        }
    }

    pub fn topic(&self) -> Topic {
        self.event.topic()
    }
}
