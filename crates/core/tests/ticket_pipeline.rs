//! Ticket pipeline integration tests.
//!
//! These tests run ingress, the event router and every consumer together
//! over SQLite, with mock chat completions and mail delivery:
//! - Ticket creation and comment persistence through the bus
//! - Origin-based notification filtering
//! - AI replies and dropped upstream failures

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use ticketflow_core::config::{ResponderConfig, SupportConfig};
use ticketflow_core::testing::{fixtures, MockChatClient, MockMailTransport};
use ticketflow_core::{
    create_event_bus, register_routes, CommentNotifier, CommentOrigin, CommentPersister,
    ConversationStore, EventBus, IdentityResolver, IngressService, LlmError, MimeMailDecoder,
    NewComment, PipelineHandlers, ResponderSettings, ResponseWorker, SqliteBlobStore,
    SqliteConversationStore, TicketService, TicketStatus,
};

/// Test helper wiring the whole pipeline around one bus.
struct TestHarness {
    store: Arc<SqliteConversationStore>,
    client: Arc<MockChatClient>,
    transport: Arc<MockMailTransport>,
    ingress: IngressService,
    tickets: TicketService,
    shutdown_tx: broadcast::Sender<()>,
    router: Option<JoinHandle<()>>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteConversationStore::new(&temp_dir.path().join("tickets.db"))
                .expect("Failed to create conversation store"),
        );
        let blobs = Arc::new(
            SqliteBlobStore::new(&temp_dir.path().join("blobs.db"))
                .expect("Failed to create blob store"),
        );
        let client = Arc::new(MockChatClient::new());
        let transport = Arc::new(MockMailTransport::new());
        let decoder = Arc::new(MimeMailDecoder);
        let support = SupportConfig::default();

        let (bus, mut router) = create_event_bus(64);
        let bus: Arc<EventBus> = Arc::new(bus);

        register_routes(
            &mut router,
            PipelineHandlers {
                persistence: Arc::new(CommentPersister::new(store.clone(), "beef.support")),
                notification: Arc::new(CommentNotifier::new(
                    store.clone(),
                    transport.clone(),
                    "support@beef.support",
                    None,
                )),
                responder: Some(Arc::new(ResponseWorker::new(
                    blobs.clone(),
                    store.clone(),
                    decoder.clone(),
                    client.clone(),
                    bus.clone(),
                    ResponderSettings::from_config(&ResponderConfig::default(), &support),
                ))),
                responder_timeout: Duration::from_secs(5),
            },
        );

        let ingress = IngressService::new(
            store.clone(),
            blobs,
            decoder,
            IdentityResolver::new(&support.tag).expect("Valid tag"),
            bus.clone(),
        );
        let tickets = TicketService::new(store.clone(), bus);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let router = tokio::spawn(router.run(shutdown_rx));

        Self {
            store,
            client,
            transport,
            ingress,
            tickets,
            shutdown_tx,
            router: Some(router),
            _temp_dir: temp_dir,
        }
    }

    /// Stop the router once its queues are drained.
    async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(router) = self.router.take() {
            tokio::time::timeout(Duration::from_secs(5), router)
                .await
                .expect("Router did not stop")
                .expect("Router panicked");
        }
    }
}

/// Poll `check` until it holds or two seconds pass.
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_new_ticket_is_persisted_through_the_bus() {
    let mut h = TestHarness::new();
    h.client.set_response("Water usually helps.").await;

    let outcome = h
        .ingress
        .receive(fixtures::inbound(
            "Help me",
            "alice@example.com",
            "My printer is on fire.",
        ))
        .await
        .unwrap();

    let view = h.tickets.get(&outcome.ticket_id).unwrap();
    assert_eq!(view.header.created_by, "alice@example.com");

    let store = h.store.clone();
    let ticket_id = outcome.ticket_id.clone();
    assert!(
        eventually(|| {
            let store = store.clone();
            let ticket_id = ticket_id.clone();
            async move { store.list_comments(&ticket_id).unwrap().len() == 2 }
        })
        .await,
        "Customer comment and AI reply should both be persisted"
    );

    let transport = h.transport.clone();
    assert!(
        eventually(|| {
            let transport = transport.clone();
            async move { transport.sent().await.len() == 2 }
        })
        .await,
        "Owner should be notified of both external comments"
    );
    h.stop().await;

    let comments = h.store.list_comments(&outcome.ticket_id).unwrap();
    assert_eq!(comments[0].comment_key, outcome.message_ref.as_str());
    assert_eq!(comments[0].from, "alice@example.com");
    assert!(comments[0].message.contains("My printer is on fire."));
    assert_eq!(comments[1].from, "beefy@beef.support");
    assert_eq!(comments[1].message, "Water usually helps.");
    assert!(comments.iter().all(|c| c.origin == CommentOrigin::External));

    let header = h.store.get_header(&outcome.ticket_id).unwrap().unwrap();
    assert_eq!(header.status, TicketStatus::BeefResponse);

    for mail in h.transport.sent().await {
        assert_eq!(mail.to, "alice@example.com");
        assert_eq!(mail.subject, format!("Re: Help me [BEEF:{}]", outcome.ticket_id));
    }
    assert_eq!(h.client.requests().await.len(), 1);
}

#[tokio::test]
async fn test_internal_api_comment_is_not_notified() {
    let mut h = TestHarness::new();
    h.store
        .create_header(&fixtures::header(
            "abc12345",
            "alice@example.com",
            "Help [BEEF:abc12345]",
        ))
        .unwrap();

    h.tickets
        .add_comment(
            "abc12345",
            NewComment {
                message: "Escalating to hardware team".to_string(),
                origin: Some(CommentOrigin::Internal),
                from: "agent@beef.support".to_string(),
            },
        )
        .await
        .unwrap();
    h.stop().await;

    let comments = h.store.list_comments("abc12345").unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].origin, CommentOrigin::Internal);
    let header = h.store.get_header("abc12345").unwrap().unwrap();
    assert_eq!(header.status, TicketStatus::BeefResponse);

    assert!(h.transport.sent().await.is_empty());
    assert!(h.client.requests().await.is_empty());
}

#[tokio::test]
async fn test_external_api_comment_notifies_owner() {
    let mut h = TestHarness::new();
    h.store
        .create_header(&fixtures::header(
            "abc12345",
            "alice@example.com",
            "Help [BEEF:abc12345]",
        ))
        .unwrap();

    h.tickets
        .add_comment(
            "abc12345",
            NewComment {
                message: "Any update?".to_string(),
                origin: None,
                from: "bob@example.com".to_string(),
            },
        )
        .await
        .unwrap();
    h.stop().await;

    let header = h.store.get_header("abc12345").unwrap().unwrap();
    assert_eq!(header.status, TicketStatus::CustomerRequest);

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "alice@example.com");
    // API comments never request an AI reply.
    assert!(h.client.requests().await.is_empty());
}

#[tokio::test]
async fn test_upstream_failure_adds_no_reply() {
    let mut h = TestHarness::new();
    h.client
        .fail_next(LlmError::Api {
            status: 429,
            message: "rate limited".to_string(),
        })
        .await;

    let outcome = h
        .ingress
        .receive(fixtures::inbound("Help me", "alice@example.com", "Hello?"))
        .await
        .unwrap();

    let client = h.client.clone();
    assert!(
        eventually(|| {
            let client = client.clone();
            async move { client.requests().await.len() == 1 }
        })
        .await,
        "Responder should have called the model"
    );
    h.stop().await;

    let comments = h.store.list_comments(&outcome.ticket_id).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].from, "alice@example.com");
    assert_eq!(h.transport.sent().await.len(), 1);
}

#[tokio::test]
async fn test_customer_reply_reaches_existing_ticket() {
    let mut h = TestHarness::new();

    let first = h
        .ingress
        .receive(fixtures::inbound("Help me", "alice@example.com", "Broken"))
        .await
        .unwrap();
    let second = h
        .ingress
        .receive(fixtures::inbound(
            &format!("Re: Help me [BEEF:{}]", first.ticket_id),
            "alice@example.com",
            "Still broken",
        ))
        .await
        .unwrap();
    assert_eq!(first.ticket_id, second.ticket_id);

    let store = h.store.clone();
    let ticket_id = first.ticket_id.clone();
    assert!(
        eventually(|| {
            let store = store.clone();
            let ticket_id = ticket_id.clone();
            async move { store.list_comments(&ticket_id).unwrap().len() == 4 }
        })
        .await,
        "Two customer comments and two replies should be persisted"
    );
    h.stop().await;

    assert_eq!(h.tickets.list().unwrap().len(), 1);
    let customer: Vec<_> = h
        .store
        .list_comments(&first.ticket_id)
        .unwrap()
        .into_iter()
        .filter(|c| c.from == "alice@example.com")
        .map(|c| c.comment_key)
        .collect();
    assert_eq!(
        customer,
        vec![
            first.message_ref.as_str().to_string(),
            second.message_ref.as_str().to_string()
        ]
    );
}
