//! `ChromaServer` builder and accept loop.
//!
//! This is the entry point for running a Chroma server. It ties together
//! all the layers: transport → coordinator (registry, store, ticks).

use std::time::Duration;

use chroma_transport::{Handshake, Transport, WebSocketHandshake, WebSocketTransport};
use tokio::task::JoinHandle;

use crate::coordinator::{Coordinator, CoordinatorConfig, CoordinatorHandle};
use crate::handler::handle_connection;
use crate::ChromaError;

/// How long a new connection may take to finish its WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Builder for configuring and starting a Chroma server.
///
/// # Example
///
/// ```rust,no_run
/// use chroma::prelude::*;
///
/// # async fn start() -> Result<(), ChromaError> {
/// let server = ChromaServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ChromaServerBuilder {
    bind_addr: String,
    config: CoordinatorConfig,
    handshake_timeout: Duration,
}

impl ChromaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            config: CoordinatorConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the coordinator configuration.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the time between broadcast ticks.
    pub fn broadcast_period(mut self, period: Duration) -> Self {
        self.config.tick.period = period;
        self
    }

    /// Sets how long a connection may take to complete its WebSocket
    /// upgrade before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and starts the coordinator.
    ///
    /// Connections are not accepted until [`ChromaServer::run`] is called.
    pub async fn build(self) -> Result<ChromaServer, ChromaError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let (coordinator, coordinator_task) = Coordinator::new(self.config).spawn();

        Ok(ChromaServer {
            transport,
            coordinator,
            coordinator_task,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

impl Default for ChromaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Chroma server, bound and ready to accept connections.
pub struct ChromaServer {
    transport: WebSocketTransport,
    coordinator: CoordinatorHandle,
    coordinator_task: JoinHandle<()>,
    handshake_timeout: Duration,
}

impl ChromaServer {
    /// Creates a new builder.
    pub fn builder() -> ChromaServerBuilder {
        ChromaServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the server's coordinator, for inspecting games or
    /// shutting the server down.
    pub fn coordinator(&self) -> CoordinatorHandle {
        self.coordinator.clone()
    }

    /// Runs the accept loop.
    ///
    /// The loop only takes connections off the listener. Each one gets its
    /// own task that completes the WebSocket upgrade and then runs the
    /// connection handler. Returns once the coordinator has stopped (see
    /// [`CoordinatorHandle::shutdown`]).
    pub async fn run(mut self) -> Result<(), ChromaError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Chroma server running");

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(handshake) => {
                        tokio::spawn(serve(
                            handshake,
                            self.coordinator.clone(),
                            self.handshake_timeout,
                        ));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                _ = self.coordinator.closed() => break,
            }
        }

        if let Err(e) = self.coordinator_task.await {
            tracing::error!(error = %e, "coordinator task failed");
        }
        tracing::info!("Chroma server stopped");
        Ok(())
    }
}

/// Completes one connection's upgrade, then hands it to the handler.
async fn serve(
    handshake: WebSocketHandshake,
    coordinator: CoordinatorHandle,
    timeout: Duration,
) {
    let peer = handshake.peer_addr();
    let conn = match tokio::time::timeout(timeout, handshake.complete()).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            tracing::debug!(%peer, error = %e, "handshake failed");
            return;
        }
        Err(_) => {
            tracing::debug!(%peer, timeout_ms = timeout.as_millis() as u64, "handshake timed out");
            return;
        }
    };

    if let Err(e) = handle_connection(conn, coordinator).await {
        tracing::debug!(%peer, error = %e, "connection ended with error");
    }
}
