//! Extraction of the newest reply from a quoted email thread.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::ParsedMail;

/// Line that separates a reply from the quoted history below it.
pub const REPLY_SEPARATOR: &str = "________________________________\n";

/// One ordered piece of the latest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Trimmed, non-empty text.
    Text(String),
    /// Inline attachment referenced as `[cid:<id>]`, base64 encoded.
    Attachment { content_id: String, base64: String },
    /// Bracketed `[https:...]` reference.
    Link(String),
}

/// The part of an email above the reply separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestMessage {
    /// Untouched text above the separator.
    pub raw: String,
    pub fragments: Vec<Fragment>,
}

impl LatestMessage {
    pub fn has_attachments(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| matches!(f, Fragment::Attachment { .. }))
    }
}

static FRAGMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(.*?)\]|([^\[]+)").expect("fragment pattern is valid"));

/// Split the newest reply of `mail` into fragments.
///
/// `[cid:X]` becomes an attachment only when an attachment with that
/// `Content-ID` exists. Bracketed text that is neither a known cid nor an
/// https link is dropped.
pub fn latest_message(mail: &ParsedMail) -> LatestMessage {
    let raw = mail
        .text
        .split(REPLY_SEPARATOR)
        .next()
        .unwrap_or_default()
        .to_string();

    let mut fragments = Vec::new();
    for caps in FRAGMENT_PATTERN.captures_iter(&raw) {
        if let Some(text) = caps.get(2) {
            let text = text.as_str().trim();
            if !text.is_empty() {
                fragments.push(Fragment::Text(text.to_string()));
            }
        }

        let Some(bracket) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if let Some(cid) = bracket.strip_prefix("cid:") {
            if let Some(attachment) = mail.attachment(cid) {
                fragments.push(Fragment::Attachment {
                    content_id: cid.to_string(),
                    base64: STANDARD.encode(&attachment.content),
                });
            }
        } else if bracket.starts_with("https:") {
            fragments.push(Fragment::Link(bracket.to_string()));
        }
    }

    LatestMessage { raw, fragments }
}
