//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! wired to the real pipeline, with mock chat completions and mail delivery,
//! so the HTTP surface can be driven without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use ticketflow_core::config::{AuthConfig, IngressConfig};
use ticketflow_core::testing::{MockChatClient, MockMailTransport};
use ticketflow_core::{
    create_authenticator, create_event_bus, register_routes, AuthMethod, CommentNotifier,
    CommentPersister, Config, EventRouter, IdentityResolver, IngressService, MimeMailDecoder,
    PipelineHandlers, ResponderSettings, ResponseWorker, SqliteBlobStore,
    SqliteConversationStore, TicketService,
};

/// Re-export fixtures for test convenience
pub use ticketflow_core::testing::fixtures;

/// Webhook token configured for every fixture.
pub const INGRESS_TOKEN: &str = "hook-secret";

/// Test fixture for API testing with mock collaborators.
///
/// The event router is created but not started, so tests can observe state
/// before routed events land. Call [`TestFixture::start_router`] to run it.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_ping() {
///     let fixture = TestFixture::new();
///     let response = fixture.get("/v1/ping").await;
///     assert_eq!(response.text, "pong");
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Direct access to the conversation store
    pub store: Arc<SqliteConversationStore>,
    /// Mock chat client - configure AI replies
    pub client: Arc<MockChatClient>,
    /// Mock transport - inspect owner notifications
    pub transport: Arc<MockMailTransport>,
    event_router: Option<EventRouter>,
    router_task: Option<JoinHandle<()>>,
    shutdown_tx: broadcast::Sender<()>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub text: String,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture without API authentication.
    pub fn new() -> Self {
        Self::with_auth(AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        })
    }

    /// Create a fixture that requires the given API key.
    pub fn with_api_key(api_key: &str) -> Self {
        Self::with_auth(AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some(api_key.to_string()),
        })
    }

    fn with_auth(auth: AuthConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let mut config: Config = ticketflow_core::load_config_from_str(&format!(
            "[auth]\nmethod = \"none\"\n\n[ingress]\ntoken = \"{}\"\n",
            INGRESS_TOKEN
        ))
        .expect("Valid test config");
        config.auth = auth;
        config.ingress = IngressConfig {
            token: INGRESS_TOKEN.to_string(),
        };
        config.database.path = db_path.clone();

        let authenticator = create_authenticator(&config.auth).expect("Valid auth config");

        let store = Arc::new(
            SqliteConversationStore::new(&db_path).expect("Failed to create conversation store"),
        );
        let blobs = Arc::new(SqliteBlobStore::new(&db_path).expect("Failed to create blob store"));
        let client = Arc::new(MockChatClient::new());
        let transport = Arc::new(MockMailTransport::new());
        let decoder = Arc::new(MimeMailDecoder);

        let (bus, mut event_router) = create_event_bus(64);
        let publisher = Arc::new(bus);
        register_routes(
            &mut event_router,
            PipelineHandlers {
                persistence: Arc::new(CommentPersister::new(store.clone(), "beef.support")),
                notification: Arc::new(CommentNotifier::new(
                    store.clone(),
                    transport.clone(),
                    config.notifier.from.clone(),
                    None,
                )),
                responder: Some(Arc::new(ResponseWorker::new(
                    blobs.clone(),
                    store.clone(),
                    decoder.clone(),
                    client.clone(),
                    publisher.clone(),
                    ResponderSettings::from_config(&config.responder, &config.support),
                ))),
                responder_timeout: Duration::from_secs(config.responder.timeout_secs),
            },
        );

        let ingress = IngressService::new(
            store.clone(),
            blobs,
            decoder,
            IdentityResolver::new(&config.support.tag).expect("Valid tag"),
            publisher.clone(),
        );
        let tickets = TicketService::new(store.clone(), publisher);

        let state = Arc::new(ticketflow_server::state::AppState::new(
            config,
            authenticator,
            ingress,
            tickets,
        ));
        let router = ticketflow_server::api::create_router(state);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            router,
            store,
            client,
            transport,
            event_router: Some(event_router),
            router_task: None,
            shutdown_tx,
            temp_dir,
        }
    }

    /// Start delivering bus events to the pipeline consumers.
    pub fn start_router(&mut self) {
        if let Some(event_router) = self.event_router.take() {
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.router_task = Some(tokio::spawn(event_router.run(shutdown_rx)));
        }
    }

    /// Stop the event router after it has drained.
    pub async fn stop_router(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(task) = self.router_task.take() {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("Router did not stop")
                .expect("Router panicked");
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path), Body::empty())
            .await
    }

    /// Send a GET request with an API key.
    pub async fn get_with_key(&self, path: &str, api_key: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("GET")
                .uri(path)
                .header("Authorization", format!("Bearer {}", api_key)),
            Body::empty(),
        )
        .await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.post_raw(path, &body.to_string()).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("Content-Type", "application/json"),
            Body::from(body.to_string()),
        )
        .await
    }

    /// Post a multipart form to the inbound email webhook.
    pub async fn post_email(&self, token: Option<&str>, fields: &[(&str, &str)]) -> TestResponse {
        let boundary = "ticketflow-test-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));

        let uri = match token {
            Some(token) => format!("/v1/inbound-email?token={}", token),
            None => "/v1/inbound-email".to_string(),
        };
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", boundary),
                ),
            Body::from(body),
        )
        .await
    }

    /// Send a request to the test server.
    pub async fn send(&self, builder: axum::http::request::Builder, body: Body) -> TestResponse {
        let request = builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, text, body }
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
