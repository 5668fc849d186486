use mail_parser::{MessageParser, MimeHeaders};

use super::{InlineAttachment, MailDecoder, MailError, ParsedMail};

/// [`MailDecoder`] backed by `mail-parser`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MimeMailDecoder;

impl MailDecoder for MimeMailDecoder {
    fn decode(&self, raw: &[u8]) -> Result<ParsedMail, MailError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(MailError::Malformed("empty message".to_string()));
        }

        let message = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| MailError::Malformed("unparseable MIME message".to_string()))?;

        let from = message
            .from()
            .and_then(|address| address.first())
            .and_then(|addr| addr.address())
            .map(str::to_string);

        let attachments = message
            .attachments()
            .map(|part| InlineAttachment {
                content_id: part
                    .content_id()
                    .map(|id| id.trim_matches(|c| c == '<' || c == '>').to_string()),
                content_type: part
                    .content_type()
                    .map(|ct| match ct.subtype() {
                        Some(sub) => format!("{}/{}", ct.ctype(), sub),
                        None => ct.ctype().to_string(),
                    })
                    .unwrap_or_else(|| "application/octet-stream".to_string()),
                content: part.contents().to_vec(),
            })
            .collect();

        Ok(ParsedMail {
            from,
            subject: message.subject().map(str::to_string),
            text: message
                .body_text(0)
                .map(|text| text.replace("\r\n", "\n"))
                .unwrap_or_default(),
            attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "From: Alice <alice@example.com>\r\n\
To: support@beef.support\r\n\
Subject: Help me\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
My printer is on fire.\r\n";

    const WITH_IMAGE: &str = "From: bob@example.com\r\n\
Subject: Screenshot [BEEF:6ab2f5c2]\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"XYZ\"\r\n\
\r\n\
--XYZ\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Look at this [cid:img1]\r\n\
--XYZ\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
Content-ID: <img1>\r\n\
Content-Disposition: inline\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--XYZ--\r\n";

    #[test]
    fn test_decode_plain_message() {
        let parsed = MimeMailDecoder.decode(PLAIN.as_bytes()).unwrap();

        assert_eq!(parsed.from.as_deref(), Some("alice@example.com"));
        assert_eq!(parsed.subject.as_deref(), Some("Help me"));
        assert!(parsed.text.contains("My printer is on fire."));
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_decode_inline_image() {
        let parsed = MimeMailDecoder.decode(WITH_IMAGE.as_bytes()).unwrap();

        assert!(parsed.text.contains("Look at this [cid:img1]"));
        let image = parsed.attachment("img1").unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.content, b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_decode_empty_is_malformed() {
        assert!(matches!(
            MimeMailDecoder.decode(b"  \r\n"),
            Err(MailError::Malformed(_))
        ));
    }
}
