use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{handlers, ingress, issues, middleware::auth_middleware};
use crate::state::AppState;

/// Upper bound for inbound email payloads, inline images included.
const INBOUND_EMAIL_LIMIT: usize = 25 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Issues API, behind the authenticator
    let issues_routes = Router::new()
        .route("/issues", get(issues::list_issues))
        .route("/issues/{ticket_id}", get(issues::get_issue))
        .route("/issues/{ticket_id}/comments", post(issues::add_comment))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    let v1_routes = Router::new()
        .route("/ping", get(handlers::ping))
        // Mail provider webhook, gated by its own token
        .route(
            "/inbound-email",
            post(ingress::inbound_email).layer(DefaultBodyLimit::max(INBOUND_EMAIL_LIMIT)),
        )
        .merge(issues_routes)
        .method_not_allowed_fallback(handlers::route_not_found)
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .fallback(handlers::route_not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
