use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketflow_core::{
    create_authenticator, create_chat_client, create_credential_provider, create_event_bus,
    create_transport, load_config, register_routes, validate_config, BlobStore, CommentNotifier,
    CommentPersister, ConversationStore, EventHandler, EventPublisher, IdentityResolver,
    IngressService, MailDecoder, MailTransport, MimeMailDecoder, PipelineHandlers,
    ResponderSettings, ResponseWorker, SqliteBlobStore, SqliteConversationStore, TicketService,
};
use ticketflow_server::{api::create_router, state::AppState};

/// Slack on top of the longest handler budget when draining at shutdown.
const ROUTER_DRAIN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("TICKETFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    // Create authenticator
    let authenticator =
        create_authenticator(&config.auth).context("Failed to create authenticator")?;
    info!("Using authenticator: {}", authenticator.method_name());

    // Create SQLite stores
    let store: Arc<dyn ConversationStore> = Arc::new(
        SqliteConversationStore::new(&config.database.path)
            .context("Failed to create conversation store")?,
    );
    let blobs: Arc<dyn BlobStore> = Arc::new(
        SqliteBlobStore::new(&config.database.path).context("Failed to create blob store")?,
    );
    info!("Stores initialized");

    let credentials = create_credential_provider(&config.credentials);
    let decoder: Arc<dyn MailDecoder> = Arc::new(MimeMailDecoder);
    let resolver =
        IdentityResolver::new(&config.support.tag).context("Invalid support tag")?;
    let support_domain = config
        .support
        .domain()
        .context("Support address has no domain")?
        .to_string();

    // Create event bus and its consumers
    let (bus, router) = create_event_bus(config.bus.buffer_size);
    let mut router =
        router.with_handler_timeout(Duration::from_secs(config.bus.handler_timeout_secs));
    let publisher: Arc<dyn EventPublisher> = Arc::new(bus);

    let transport = create_transport(&config.notifier, Arc::clone(&credentials));
    info!("Using mail transport: {}", transport.name());

    let responder: Option<Arc<dyn EventHandler>> = if config.responder.enabled {
        let client = create_chat_client(&config.responder, Arc::clone(&credentials));
        info!(
            "Responder enabled (text model: {}, vision model: {})",
            config.responder.text_model, config.responder.vision_model
        );
        Some(Arc::new(ResponseWorker::new(
            Arc::clone(&blobs),
            Arc::clone(&store),
            Arc::clone(&decoder),
            client,
            Arc::clone(&publisher),
            ResponderSettings::from_config(&config.responder, &config.support),
        )))
    } else {
        info!("Responder disabled in config");
        None
    };

    register_routes(
        &mut router,
        PipelineHandlers {
            persistence: Arc::new(CommentPersister::new(Arc::clone(&store), support_domain)),
            notification: Arc::new(CommentNotifier::new(
                Arc::clone(&store),
                transport,
                config.notifier.from.clone(),
                config.notifier.reply_to.clone(),
            )),
            responder,
            responder_timeout: Duration::from_secs(config.responder.timeout_secs),
        },
    );

    // An in-flight response generation may run for its full budget.
    let longest_handler = if config.responder.enabled {
        config
            .responder
            .timeout_secs
            .max(config.bus.handler_timeout_secs)
    } else {
        config.bus.handler_timeout_secs
    };
    let drain_timeout = Duration::from_secs(longest_handler) + ROUTER_DRAIN_GRACE;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let router_handle = tokio::spawn(router.run(shutdown_rx));

    // Create app state
    let ingress = IngressService::new(
        Arc::clone(&store),
        blobs,
        decoder,
        resolver,
        Arc::clone(&publisher),
    );
    let tickets = TicketService::new(store, publisher);
    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        ingress,
        tickets,
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Deliver whatever is still queued before exiting.
    info!("Server shutting down...");
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(drain_timeout, router_handle).await {
        Ok(Ok(())) => info!("Event router stopped"),
        Ok(Err(e)) => error!("Event router task failed: {}", e),
        Err(_) => error!("Event router did not drain within {:?}", drain_timeout),
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
