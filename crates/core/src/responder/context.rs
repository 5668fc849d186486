//! Conversation context for the AI reply.

use super::llm::{ChatMessage, ContentPart, Role};
use crate::mail::{Fragment, LatestMessage};
use crate::ticket::{is_support_sender, Comment};

/// System prompt used when none is configured.
pub const DEFAULT_PERSONA: &str = "You are a support ticket bot. \
You are snarky and always know better than the user, and you are not afraid to point out \
weaknesses in the user's input or logic. You have a beef with the user, but you are not mean, \
and you do try to solve the issue while being a bit cocky. \
Respond with short sarcastic sentences. \
If you get any questions about food, always respond with something related to fish. Meat sucks.";

/// Models to choose between for a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub text_model: String,
    pub vision_model: String,
}

impl ModelSelection {
    /// The vision model when the message carries an inline image.
    pub fn for_message(&self, latest: &LatestMessage) -> &str {
        if latest.has_attachments() {
            &self.vision_model
        } else {
            &self.text_model
        }
    }
}

/// Comments that precede the message being answered.
///
/// The newest stored comment is left out: it is the inbound message itself,
/// which is replayed from its fragments instead.
pub fn prior_comments(comments: &[Comment]) -> &[Comment] {
    &comments[..comments.len().saturating_sub(1)]
}

/// Assemble the chat messages for a reply.
///
/// Order: persona, one turn per prior comment, one user turn per text or
/// attachment fragment. Links are not sent.
pub fn build_messages(
    persona: &str,
    history: &[Comment],
    latest: &LatestMessage,
    support_domain: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(1 + history.len() + latest.fragments.len());
    messages.push(ChatMessage::system(persona));

    messages.extend(history.iter().map(|comment| {
        let role = if is_support_sender(&comment.from, support_domain) {
            Role::Assistant
        } else {
            Role::User
        };
        ChatMessage::new(role, ContentPart::text(comment.message.clone()))
    }));

    messages.extend(latest.fragments.iter().filter_map(|fragment| match fragment {
        Fragment::Text(text) => Some(ChatMessage::user(text.clone())),
        Fragment::Attachment { base64, .. } => {
            Some(ChatMessage::new(Role::User, ContentPart::png_base64(base64)))
        }
        Fragment::Link(_) => None,
    }));

    messages
}
