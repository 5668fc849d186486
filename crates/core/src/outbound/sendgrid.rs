use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{MailTransport, OutboundMail, TransportError};
use crate::credentials::CredentialProvider;

/// SendGrid v3 mail-send client.
pub struct SendGridTransport {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    credential_name: String,
    api_base: String,
}

impl SendGridTransport {
    pub fn new(credentials: Arc<dyn CredentialProvider>, credential_name: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            credential_name: credential_name.into(),
            api_base: "https://api.sendgrid.com".to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<SendGridPersonalization<'a>>,
    from: SendGridAddress<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<SendGridAddress<'a>>,
    subject: &'a str,
    content: Vec<SendGridContent<'a>>,
}

#[derive(Debug, Serialize)]
struct SendGridPersonalization<'a> {
    to: Vec<SendGridAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct SendGridAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct SendGridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

impl<'a> From<&'a OutboundMail> for SendGridRequest<'a> {
    fn from(mail: &'a OutboundMail) -> Self {
        Self {
            personalizations: vec![SendGridPersonalization {
                to: vec![SendGridAddress { email: &mail.to }],
            }],
            from: SendGridAddress { email: &mail.from },
            reply_to: mail
                .reply_to
                .as_deref()
                .map(|email| SendGridAddress { email }),
            subject: &mail.subject,
            content: vec![SendGridContent {
                content_type: "text/plain",
                value: &mail.text,
            }],
        }
    }
}

#[async_trait]
impl MailTransport for SendGridTransport {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, mail: &OutboundMail) -> Result<(), TransportError> {
        let api_key = self.credentials.get(&self.credential_name).await?;

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(api_key)
            .json(&SendGridRequest::from(mail))
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 401 {
                self.credentials.invalidate(&self.credential_name).await;
            }
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
