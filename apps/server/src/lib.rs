//! # QPay Server
//!
//! Payment webhook backend built on `Axum`: Stripe and PayPal deliveries are
//! verified, deduplicated through Redis (or an in-process cache), and recorded
//! in a hash-chained audit trail.
//!
//! ## Example
//! ```no_run
//! use qpay_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(3000)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum_server::Handle;
use qpay::domain::config::ApiConfig;
use qpay::BackgroundTasks;
use qpay::kernel::server::ApiState;
use qpay_cache::IdempotencyStore;
use qpay_event_bus::EventBus;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

const GRACE_PERIOD: Duration = Duration::from_secs(30);
const DRAIN_PERIOD: Duration = Duration::from_secs(5);

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    async fn init_idempotency(&self) -> IdempotencyStore {
        let cache = &self.cfg.cache;
        IdempotencyStore::builder()
            .redis_url(cache.redis_url.clone())
            .ttl(Duration::from_secs(cache.ttl_seconds))
            .capacity(cache.capacity)
            .build()
            .await
    }

    fn validate_ssl_config(&self) -> Result<()> {
        if let Some(ssl) = &self.cfg.server.ssl {
            if !ssl.cert.exists() {
                anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
            }
            if !ssl.key.exists() {
                anyhow::bail!("SSL key not found at: {}", ssl.key.display());
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let metadata = ssl.key.metadata()?;
                if metadata.permissions().mode() & 0o077 != 0 {
                    warn!(
                        "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                        ssl.key.display()
                    );
                }
            }
        }
        Ok(())
    }

    fn warn_missing_secrets(&self) {
        if self.cfg.stripe.webhook_secret.is_empty() {
            warn!("STRIPE_WEBHOOK_SECRET is not set; Stripe webhooks will be rejected");
        }
        if self.cfg.stripe.secret_key.is_empty() {
            warn!("STRIPE_SECRET_KEY is not set; billing portal sessions are unavailable");
        }
        if self.cfg.cache.redis_url.is_none() {
            warn!("REDIS_URL is not set; processed events are remembered by this instance only");
        }
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Validates SSL files and reports missing provider secrets
    /// 2. Connects the idempotency store (Redis, or in-memory fallback)
    /// 3. Initializes the event bus and every feature slice
    /// 4. Constructs application state
    ///
    /// # Errors
    /// Returns an error if:
    /// * SSL certificate/key files are missing
    /// * A feature slice fails to initialize (e.g. the audit file is unusable)
    pub async fn build(self) -> Result<Server> {
        // 1. Validate Configuration
        self.validate_ssl_config()?;
        self.warn_missing_secrets();

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        // 2. Idempotency
        let idempotency = self.init_idempotency().await;

        // 3. Orchestrate Feature Slices
        let events = EventBus::new();
        let platform = qpay::init(&self.cfg, &events)
            .await
            .map_err(|e| anyhow!("Platform bootstrap failed: {e}"))?;

        // 4. Construct State
        let state = ApiState::builder()
            .config(self.cfg)
            .events(events)
            .idempotency(idempotency)
            .register_slices(platform.slices)
            .build()
            .context("Failed to finalize API state registry")?;

        info!(slices = ?state.slice_names().collect::<Vec<_>>(), "Feature slices registered");
        Ok(Server { state, tasks: platform.tasks })
    }
}

/// A fully initialized server instance ready to run.
///
/// This struct is returned by [`ServerBuilder::build`] and contains
/// all necessary runtime state.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
    tasks: BackgroundTasks,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until the shutdown signal is received.
    ///
    /// In-flight requests get a grace period, then the event bus is closed and
    /// background listeners (the audit trail) are awaited until they have
    /// drained what was queued.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address
    /// or if SSL/TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let cfg = self.state.config.clone();
        let events = self.state.events.clone();
        let address = SocketAddr::new(cfg.server.address, cfg.server.port);

        info!(address = %address, ssl = cfg.server.ssl.is_some(), "Starting server");

        let app = self.router();

        // Graceful shutdown
        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            shutdown_handle.graceful_shutdown(Some(GRACE_PERIOD));
        });

        let served = if let Some(ssl_config) = &cfg.server.ssl {
            info!("Starting HTTPS server on https://{address}");

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &ssl_config.cert,
                &ssl_config.key,
            )
            .await
            .context("Failed to load SSL/TLS certificates")?;

            axum_server::bind_rustls(address, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTPS server failed")
        } else {
            info!("Starting HTTP server on http://{address}");

            axum_server::bind(address)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .context("HTTP server failed")
        };

        let closed = events.shutdown();
        info!(channels = closed, "Event bus closed");

        let pending = self.tasks.len();
        let unfinished = self.tasks.join(DRAIN_PERIOD).await;
        if unfinished > 0 {
            warn!(unfinished, "Background tasks did not drain before exit");
        } else {
            info!(tasks = pending, "Background tasks drained");
        }

        served?;
        info!("Server shutdown complete");
        Ok(())
    }

    /// The complete HTTP application: API routes, tracing and the `/api` reference.
    pub fn router(&self) -> Router {
        router::init(self.state.clone())
    }

    /// OpenAPI document of every enabled route.
    #[must_use]
    pub fn openapi() -> utoipa::openapi::OpenApi {
        router::openapi()
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
///
/// Hosting platforms stop instances with SIGTERM before a redeploy.
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res?,
        res = terminate => res?,
    }

    Ok(())
}
