//! Ticket identity resolution from email subjects.

use regex_lite::Regex;
use uuid::Uuid;

const TOKEN_LEN: usize = 8;
const TOKEN_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Outcome of resolving a subject line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub ticket_id: String,
    /// True when the subject carried no tag and the id was just minted.
    pub is_new: bool,
}

/// Extracts the ticket id from a `[TAG:<id>]` subject tag, or mints one.
///
/// Minted ids are not checked against the store.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    tag: String,
    pattern: Regex,
}

impl IdentityResolver {
    pub fn new(tag: &str) -> Result<Self, regex_lite::Error> {
        let pattern = Regex::new(&format!(
            r"\[{}:([A-Za-z0-9_]+)\]",
            regex_lite::escape(tag)
        ))?;
        Ok(Self {
            tag: tag.to_string(),
            pattern,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Resolve a subject. The first tag wins.
    pub fn resolve(&self, subject: &str) -> ResolvedIdentity {
        match self.extract(subject) {
            Some(ticket_id) => ResolvedIdentity {
                ticket_id,
                is_new: false,
            },
            None => ResolvedIdentity {
                ticket_id: mint_token(),
                is_new: true,
            },
        }
    }

    /// Ticket id embedded in `subject`, if any.
    pub fn extract(&self, subject: &str) -> Option<String> {
        self.pattern
            .captures(subject)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Append the ticket tag to a subject unless it is already there.
    pub fn tag_subject(&self, subject: &str, ticket_id: &str) -> String {
        let tag = format!("[{}:{}]", self.tag, ticket_id);
        if subject.contains(&tag) {
            return subject.to_string();
        }
        if subject.is_empty() {
            return tag;
        }
        format!("{} {}", subject, tag)
    }
}

/// Short random token over `[0-9A-Za-z]`, drawn from a v4 UUID.
fn mint_token() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let radix = TOKEN_ALPHABET.len() as u128;
    let mut token = String::with_capacity(TOKEN_LEN);
    for _ in 0..TOKEN_LEN {
        token.push(TOKEN_ALPHABET[(bits % radix) as usize] as char);
        bits /= radix;
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn resolver() -> IdentityResolver {
        IdentityResolver::new("BEEF").unwrap()
    }

    #[test]
    fn test_resolve_tagged_subject() {
        let resolved = resolver().resolve("Re: Help me [BEEF:6ab2f5c2]");
        assert_eq!(
            resolved,
            ResolvedIdentity {
                ticket_id: "6ab2f5c2".to_string(),
                is_new: false,
            }
        );
    }

    #[test]
    fn test_first_tag_wins() {
        let resolved = resolver().resolve("[BEEF:first123] fwd [BEEF:second12]");
        assert_eq!(resolved.ticket_id, "first123");
    }

    #[test]
    fn test_other_tags_are_ignored() {
        let resolved = resolver().resolve("Help [PORK:6ab2f5c2]");
        assert!(resolved.is_new);
        assert_ne!(resolved.ticket_id, "6ab2f5c2");
    }

    #[test]
    fn test_untagged_subject_mints_token() {
        let resolved = resolver().resolve("Help me");
        assert!(resolved.is_new);
        assert_eq!(resolved.ticket_id.len(), 8);
        assert!(resolved.ticket_id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_minted_tokens_do_not_collide() {
        let r = resolver();
        let ids: HashSet<String> = (0..10_000).map(|_| r.resolve("Help").ticket_id).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_custom_tag() {
        let r = IdentityResolver::new("ACME").unwrap();
        assert_eq!(r.extract("Order [ACME:x_1]"), Some("x_1".to_string()));
        assert_eq!(r.extract("Order [BEEF:x_1]"), None);
    }

    #[test]
    fn test_tag_subject() {
        let r = resolver();
        assert_eq!(
            r.tag_subject("Help me", "6ab2f5c2"),
            "Help me [BEEF:6ab2f5c2]"
        );
        assert_eq!(
            r.tag_subject("Help me [BEEF:6ab2f5c2]", "6ab2f5c2"),
            "Help me [BEEF:6ab2f5c2]"
        );
        assert_eq!(r.tag_subject("", "6ab2f5c2"), "[BEEF:6ab2f5c2]");
    }

    #[test]
    fn test_tagged_subject_resolves_back() {
        let r = resolver();
        let minted = r.resolve("Help me");
        let subject = r.tag_subject("Help me", &minted.ticket_id);
        assert_eq!(r.resolve(&subject).ticket_id, minted.ticket_id);
    }
}
