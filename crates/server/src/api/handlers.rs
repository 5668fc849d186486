use axum::{extract::OriginalUri, http::StatusCode};

/// Liveness probe
pub async fn ping() -> &'static str {
    "pong"
}

/// Fallback for unknown paths and unsupported methods
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("Route {} does not exist", uri.path()),
    )
}
