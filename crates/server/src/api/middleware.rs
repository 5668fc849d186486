//! Authentication middleware for the issues API.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use ticketflow_core::{AuthError, AuthRequest, Identity};
use tracing::{error, warn};

use crate::state::AppState;

/// Authentication middleware that validates requests using the configured authenticator.
///
/// Missing or wrong credentials are answered with 403 Forbidden.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let authenticator = state.authenticator();

    if authenticator.is_open() {
        request.extensions_mut().insert(Identity::anonymous());
        return next.run(request).await;
    }

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    match authenticator.authenticate(&AuthRequest { headers }).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e @ AuthError::Misconfigured(_)) => {
            error!(error = %e, "Issues API authentication misconfigured");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            warn!(path = %request.uri().path(), reason = %e, "Rejected unauthenticated request");
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}

/// Extractor for the authenticated agent id.
///
/// Falls back to "anonymous" if no identity is present.
#[derive(Debug, Clone)]
pub struct AuthAgent(pub String);

impl<S> FromRequestParts<S> for AuthAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let agent_id = parts
            .extensions
            .get::<Identity>()
            .map(|id| id.agent_id.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        std::future::ready(Ok(AuthAgent(agent_id)))
    }
}
