//! Ticket query and comment API handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use ticketflow_core::{NewComment, PipelineError, TicketHeader, TicketView};

use super::error::ApiError;
use super::middleware::AuthAgent;
use crate::state::AppState;

/// List every ticket header, ordered by ticket id
pub async fn list_issues(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TicketHeader>>, ApiError> {
    Ok(Json(state.tickets().list()?))
}

/// Get a ticket with its comments
pub async fn get_issue(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketView>, ApiError> {
    Ok(Json(state.tickets().get(&ticket_id)?))
}

/// Add a comment to a ticket.
///
/// The comment is routed through the bus; it shows up in `get_issue` once
/// persisted.
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    AuthAgent(agent): AuthAgent,
    Path(ticket_id): Path<String>,
    body: Result<Json<NewComment>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(comment) = body.map_err(|e| PipelineError::MalformedInput(e.body_text()))?;

    tracing::debug!(ticket_id = %ticket_id, agent = %agent, "Adding comment");
    state.tickets().add_comment(&ticket_id, comment).await?;

    Ok(StatusCode::OK)
}
