//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;

use crate::application::services::woocommerce::WebhookWorker;
use crate::config::Settings;
use crate::infrastructure::queue::{create_redis_client, InMemoryJobQueue, JobQueue, RedisJobQueue};
use crate::infrastructure::woocommerce::{HttpWooClientFactory, WooClientFactory};
use crate::infrastructure::database;
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub queue: Arc<dyn JobQueue>,
    pub woo: Arc<dyn WooClientFactory>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Assemble state from already-connected dependencies.
    pub fn new(
        db: PgPool,
        queue: Arc<dyn JobQueue>,
        woo: Arc<dyn WooClientFactory>,
        settings: Settings,
    ) -> Self {
        Self {
            db,
            queue,
            woo,
            settings: Arc::new(settings),
        }
    }
}

/// Router with every middleware layer applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    // CORS innermost: its response body must be `Default`.
    routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(CompressionLayer::new())
            .layer(logging::create_trace_layer())
            .layer(cors),
    )
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        database::run_migrations(&db).await?;
        tracing::info!("Database migrations applied");

        // Webhook job queue
        let queue: Arc<dyn JobQueue> = if settings.redis.is_configured() {
            let conn = create_redis_client(&settings.redis).await?;
            Arc::new(RedisJobQueue::new(conn))
        } else {
            tracing::warn!("REDIS_URL not set, webhook jobs use an in-process queue");
            Arc::new(InMemoryJobQueue::new())
        };

        let woo: Arc<dyn WooClientFactory> =
            Arc::new(HttpWooClientFactory::new(&settings.woocommerce)?);

        let addr = settings.server_addr();
        let state = AppState::new(db, queue, woo, settings);
        let router = build_router(state.clone());

        // Bind to address
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server and webhook workers until Ctrl-C
    pub async fn run_until_stopped(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = Arc::new(WebhookWorker::new(
            Arc::new(handlers::stores::sync_service(&self.state)),
            self.state.queue.clone(),
            self.state.settings.webhooks.clone(),
        ));
        let workers = worker.spawn(shutdown_rx);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped, draining webhook workers");
        let _ = shutdown_tx.send(true);
        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Webhook worker panicked");
            }
        }
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, run until killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
