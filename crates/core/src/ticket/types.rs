//! Core conversation data types.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ticket header.
///
/// There is no terminal state: every new comment moves the ticket again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Ticket was just opened by an inbound email.
    New,
    /// The owner replied to an existing ticket by email.
    CustomerResponse,
    /// Latest comment came from outside the support domain.
    CustomerRequest,
    /// Latest comment came from the support domain.
    BeefResponse,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "NEW",
            TicketStatus::CustomerResponse => "CUSTOMER_RESPONSE",
            TicketStatus::CustomerRequest => "CUSTOMER_REQUEST",
            TicketStatus::BeefResponse => "BEEF_RESPONSE",
        }
    }

    /// Status a ticket moves to once a comment from `from` is recorded.
    ///
    /// Senders inside `support_domain` produce `BEEF_RESPONSE`, everyone else
    /// `CUSTOMER_REQUEST`. The previous status does not matter.
    pub fn after_comment(from: &str, support_domain: &str) -> Self {
        if is_support_sender(from, support_domain) {
            TicketStatus::BeefResponse
        } else {
            TicketStatus::CustomerRequest
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(TicketStatus::New),
            "CUSTOMER_RESPONSE" => Ok(TicketStatus::CustomerResponse),
            "CUSTOMER_REQUEST" => Ok(TicketStatus::CustomerRequest),
            "BEEF_RESPONSE" => Ok(TicketStatus::BeefResponse),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

/// Returns true when `from` is an address inside `support_domain`.
pub fn is_support_sender(from: &str, support_domain: &str) -> bool {
    let Some((_, domain)) = from.trim().rsplit_once('@') else {
        return false;
    };
    domain.eq_ignore_ascii_case(support_domain)
}

/// Whether a comment is visible to the ticket owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CommentOrigin {
    Internal,
    External,
}

impl CommentOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentOrigin::Internal => "internal",
            CommentOrigin::External => "external",
        }
    }
}

impl fmt::Display for CommentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(CommentOrigin::Internal),
            "external" => Ok(CommentOrigin::External),
            other => Err(format!("unknown comment origin: {}", other)),
        }
    }
}

/// One per ticket. Only `status` and `last_updated` change after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketHeader {
    pub ticket_id: String,
    /// Address of the sender that opened the ticket.
    pub created_by: String,
    /// Display subject carrying the ticket tag.
    pub subject: String,
    pub status: TicketStatus,
    pub last_updated: DateTime<Utc>,
    /// Message reference of the first inbound email.
    pub original_id: String,
}

impl TicketHeader {
    /// Header for a freshly opened ticket.
    pub fn opened(
        ticket_id: impl Into<String>,
        created_by: impl Into<String>,
        subject: impl Into<String>,
        original_id: impl Into<String>,
    ) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            created_by: created_by.into(),
            subject: subject.into(),
            status: TicketStatus::New,
            last_updated: Utc::now(),
            original_id: original_id.into(),
        }
    }
}

/// An append-only entry in a ticket's conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub ticket_id: String,
    /// Sort key within the ticket, derived from the message reference.
    pub comment_key: String,
    pub from: String,
    pub message: String,
    pub origin: CommentOrigin,
    pub last_updated: DateTime<Utc>,
}

static LAST_REF_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Reference to one message in a ticket, formatted `<ticket_id>.<millis>`.
///
/// Millisecond values come from a process-wide monotonic clock, so two
/// references minted in the same process never compare equal and sort in
/// creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(String);

impl MessageRef {
    /// Mint the next reference for `ticket_id`.
    pub fn next(ticket_id: &str) -> Self {
        let millis = next_millis(Utc::now().timestamp_millis());
        Self(format!("{}.{:013}", ticket_id, millis))
    }

    /// Wrap a reference that was minted elsewhere.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ticket part of the reference.
    pub fn ticket_id(&self) -> &str {
        self.0
            .rsplit_once('.')
            .map(|(ticket, _)| ticket)
            .unwrap_or(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn next_millis(now: i64) -> i64 {
    let mut last = LAST_REF_MILLIS.load(Ordering::Relaxed);
    loop {
        let candidate = if now > last { now } else { last + 1 };
        match LAST_REF_MILLIS.compare_exchange_weak(
            last,
            candidate,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => last = actual,
        }
    }
}
