//! Inbound email webhook.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use ticketflow_core::InboundEmail;

use super::error::{reject, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IngressParams {
    pub token: Option<String>,
}

/// Receive one email from the mail provider.
///
/// The payload is `multipart/form-data` with `email` (raw RFC 822) and
/// `subject` fields. Other fields are ignored.
pub async fn inbound_email(
    State(state): State<Arc<AppState>>,
    Query(params): Query<IngressParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    if !state.verify_ingress_token(params.token.as_deref()) {
        warn!("Rejected inbound email with bad token");
        return reject(StatusCode::FORBIDDEN, "Forbidden");
    }

    let inbound = match multipart {
        Ok(multipart) => match read_form(multipart).await {
            Ok(inbound) => inbound,
            Err(message) => return reject(StatusCode::BAD_REQUEST, message),
        },
        Err(rejection) => return reject(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    match state.ingress().receive(inbound).await {
        Ok(outcome) => {
            debug!(
                ticket_id = %outcome.ticket_id,
                message_ref = %outcome.message_ref,
                is_new = outcome.is_new,
                "Inbound email accepted"
            );
            StatusCode::OK.into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

async fn read_form(mut multipart: Multipart) -> Result<InboundEmail, String> {
    let mut email = None;
    let mut subject = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("email") => email = Some(field.text().await.map_err(|e| e.body_text())?),
            Some("subject") => subject = Some(field.text().await.map_err(|e| e.body_text())?),
            _ => {}
        }
    }

    Ok(InboundEmail {
        email: email.ok_or("Missing field: email")?,
        subject: subject.ok_or("Missing field: subject")?,
    })
}
