pub mod error;
pub mod handlers;
pub mod ingress;
pub mod issues;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
