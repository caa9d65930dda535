//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeout, limits, CORS, compression)
//! - Own the shared state: fetch client, rewriter, bookmark store, sessions
//! - Serve until the shutdown coordinator fires

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::bookmarks::BookmarkStore;
use crate::config::ProxyConfig;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::http::{api, proxy, websocket};
use crate::lifecycle::Shutdown;
use crate::realtime::SessionRegistry;
use crate::rewrite::PageRewriter;
use crate::security::apply_security_headers;
use crate::upstream::{FetchClient, FetchResult};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub fetcher: FetchClient,
    pub rewriter: PageRewriter,
    pub store: Arc<BookmarkStore>,
    pub sessions: Arc<SessionRegistry>,
    pub shutdown: Shutdown,
}

impl AppState {
    /// Build state; the store reports changes to the session registry.
    pub fn new(config: ProxyConfig, shutdown: Shutdown) -> FetchResult<Self> {
        let fetcher = FetchClient::new(&config.upstream)?;
        let sessions = Arc::new(SessionRegistry::with_queue(config.realtime.session_queue));
        let store = Arc::new(BookmarkStore::new(sessions.clone()));

        Ok(Self {
            rewriter: PageRewriter::new(config.rewrite.inject_bootstrap),
            config: Arc::new(config),
            fetcher,
            store,
            sessions,
            shutdown,
        })
    }

    /// Path of the client application shell.
    pub fn shell_path(&self) -> PathBuf {
        let files = &self.config.static_files;
        PathBuf::from(&files.root).join(&files.index)
    }
}

/// HTTP server for the forward proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig, shutdown: Shutdown) -> FetchResult<Self> {
        let state = AppState::new(config, shutdown)?;
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.clone();
        let shell = ServeFile::new(state.shell_path());
        let static_files = ServeDir::new(&config.static_files.root).not_found_service(shell);

        let router = Router::new()
            .route("/", get(websocket::root_handler))
            .route("/ws", get(websocket::ws_handler))
            .route("/proxy", get(proxy::proxy_handler))
            .route(
                "/api/bookmarks",
                get(api::list_bookmarks)
                    .post(api::add_bookmark)
                    .delete(api::clear_bookmarks),
            )
            .route("/api/bookmarks/{url}", delete(api::remove_bookmark))
            .route("/api/autocomplete", get(api::autocomplete))
            .route("/health", get(api::health))
            .fallback_service(static_files)
            .with_state(state);

        let router = if config.security.enable_headers {
            apply_security_headers(router)
        } else {
            router
        };

        router
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            proxy_endpoint = %format!("http://{}/proxy?url=<target_url>", addr),
            "HTTP server starting"
        );

        let mut shutdown = self.state.shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
