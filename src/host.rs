//! Process host
//!
//! Owns the HTTP/WebSocket listener, the browser lifecycle, and the mapping
//! from inbound client commands to flow invocations. Exactly one flow may be
//! in progress at a time; a concurrent request is rejected with an error
//! notification, never queued.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use futures_util::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::channel::StatusChannel;
use crate::flow::FlowController;
use crate::manager::BrowserManager;
use crate::utils::{validate_interaction_timeout, validate_navigation_timeout};
use crate::Config;

const LANDING_HTML: &str = include_str!("../static/index.html");

/// Inbound client commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    StartUniversalSearch { query: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Payload is not JSON, or a known command is missing required fields
    #[error("Invalid message format")]
    Malformed,

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

impl ClientCommand {
    /// Parse one inbound frame
    ///
    /// Distinguishes a malformed payload from a well-formed command of an
    /// unknown kind; the two produce different error notifications.
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let value: Value = serde_json::from_str(text).map_err(|_| CommandError::Malformed)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CommandError::Malformed)?;

        match kind {
            "start_universal_search" => {
                let query = value
                    .get("query")
                    .and_then(Value::as_str)
                    .ok_or(CommandError::Malformed)?;
                Ok(ClientCommand::StartUniversalSearch {
                    query: query.to_string(),
                })
            }
            other => Err(CommandError::UnknownType(other.to_string())),
        }
    }
}

/// Clears the processing flag when a flow task ends, however it ends
struct ProcessingGuard(Arc<AtomicBool>);

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct ProcessHost {
    manager: Arc<BrowserManager>,
    channel: StatusChannel,
    processing: Arc<AtomicBool>,
    config: Arc<Config>,
}

impl ProcessHost {
    pub fn new(config: Config) -> Result<Self> {
        validate_navigation_timeout(config.timeouts.navigation_ms)?;
        validate_navigation_timeout(config.timeouts.network_settle_ms)?;
        validate_interaction_timeout(config.timeouts.selector_ms)?;
        validate_interaction_timeout(config.timeouts.popup_probe_ms)?;
        validate_navigation_timeout(config.timeouts.click_nav_ms)?;

        Ok(Self {
            manager: Arc::new(BrowserManager::new(config.browser.clone())),
            channel: StatusChannel::new(),
            processing: Arc::new(AtomicBool::new(false)),
            config: Arc::new(config),
        })
    }

    /// Bind the listener and serve until a termination signal arrives
    ///
    /// Releases the browser and closes the channel before returning, so the
    /// process exits cleanly with status 0.
    pub async fn serve(self: Arc<Self>) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .server
            .listen
            .parse()
            .with_context(|| format!("invalid listen address: {}", self.config.server.listen))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        info!("Listening on http://{addr}");

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server failed")?;

        self.release_resources().await;
        Ok(())
    }

    pub fn router(self: &Arc<Self>) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/", get(index))
            .route("/ws", get(ws_handler))
            .layer(cors)
            .with_state(Arc::clone(self))
    }

    /// Release the browser and drop the client reference
    pub async fn release_resources(&self) {
        if let Err(e) = self.manager.shutdown().await {
            warn!(error = %e, "browser shutdown failed");
        }
        self.channel.detach().await;
        info!("Shutdown complete");
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Claim the single flow slot; false when one is already running
    fn try_begin_flow(&self) -> bool {
        self.processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// One connected client's lifetime
    ///
    /// Attaching replaces any previous client. The browser is acquired
    /// lazily here, on attachment; launch failure is reported over the
    /// channel and does not kill the server.
    async fn handle_client(self: Arc<Self>, socket: WebSocket) {
        info!("Client connected");
        let (sender, mut receiver) = socket.split();
        self.channel.attach(sender).await;

        match self.manager.get_or_launch().await {
            Ok(_) => {
                self.channel
                    .status("Autonomous shopping assistant ready")
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "browser initialization failed");
                self.channel
                    .error("Failed to initialize browser automation")
                    .await;
            }
        }

        while let Some(msg) = receiver.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) | Err(_) => break,
                _ => continue,
            };
            self.dispatch(&text).await;
        }

        info!("Client disconnected");
        self.channel.detach().await;
    }

    async fn dispatch(&self, text: &str) {
        match ClientCommand::parse(text) {
            Ok(ClientCommand::StartUniversalSearch { query }) => {
                self.start_search(query).await;
            }
            Err(e) => self.channel.error(e.to_string()).await,
        }
    }

    /// Start a flow unless one is already in progress
    ///
    /// The flow runs on its own task so further inbound frames are still
    /// read (and rejected) instead of queueing in the socket.
    async fn start_search(&self, query: String) {
        let query = query.trim().to_string();
        if query.is_empty() {
            self.channel.error("Search query must not be empty").await;
            return;
        }

        if !self.try_begin_flow() {
            self.channel
                .error("Autonomous flow already in progress")
                .await;
            return;
        }

        let manager = Arc::clone(&self.manager);
        let channel = self.channel.clone();
        let config = Arc::clone(&self.config);
        let processing = Arc::clone(&self.processing);
        tokio::spawn(async move {
            let _guard = ProcessingGuard(processing);
            run_flow_task(manager, channel, config, &query).await;
        });
    }
}

/// One spawned flow invocation, start to finish
async fn run_flow_task(
    manager: Arc<BrowserManager>,
    channel: StatusChannel,
    config: Arc<Config>,
    query: &str,
) {
    let page = match manager.page().await {
        Ok(page) => page,
        Err(e) => {
            warn!(error = %e, "browser acquisition failed");
            channel
                .error(format!("Flow encountered an issue: {e}"))
                .await;
            return;
        }
    };

    let controller = FlowController::new(&page, &channel, &config.pacing, &config.timeouts);
    let analysis = controller.run_flow(query).await;
    info!(
        products = analysis.total_products_found,
        query, "flow completed"
    );
}

async fn index() -> Html<&'static str> {
    Html(LANDING_HTML)
}

async fn ws_handler(
    State(host): State<Arc<ProcessHost>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| host.handle_client(socket))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_host() -> Arc<ProcessHost> {
        Arc::new(ProcessHost::new(Config::default()).unwrap())
    }

    #[test]
    fn parses_start_universal_search() {
        let command =
            ClientCommand::parse(r#"{"type":"start_universal_search","query":"wireless mouse"}"#)
                .unwrap();
        assert_eq!(
            command,
            ClientCommand::StartUniversalSearch {
                query: "wireless mouse".to_string()
            }
        );
    }

    #[test]
    fn unknown_type_is_distinguished_from_malformed() {
        assert_eq!(
            ClientCommand::parse(r#"{"type":"stop_everything"}"#),
            Err(CommandError::UnknownType("stop_everything".to_string()))
        );
        assert_eq!(
            ClientCommand::parse("not json at all"),
            Err(CommandError::Malformed)
        );
        // Known type with a missing required field is malformed, not unknown
        assert_eq!(
            ClientCommand::parse(r#"{"type":"start_universal_search"}"#),
            Err(CommandError::Malformed)
        );
    }

    #[test]
    fn flow_slot_is_exclusive_until_released() {
        let host = test_host();
        assert!(!host.is_processing());
        assert!(host.try_begin_flow());
        assert!(host.is_processing());
        // Second claim while a flow is in progress is rejected
        assert!(!host.try_begin_flow());

        drop(ProcessingGuard(Arc::clone(&host.processing)));
        assert!(!host.is_processing());
        assert!(host.try_begin_flow());
    }

    #[test]
    fn oversized_configured_timeouts_are_rejected() {
        let mut config = Config::default();
        config.timeouts.selector_ms = 120_000;
        assert!(ProcessHost::new(config).is_err());
    }
}
