//! Relay accept loop.
//!
//! # Responsibilities
//! - Accept connections within the listener's connection limit
//! - Run each connection in its own task under a tracing span
//! - Stop accepting on shutdown and wait for open connections to drain

use std::sync::Arc;

use tracing::Instrument;

use crate::config::RelayConfig;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::proxy::handler;
use crate::stream::DuplexStream;

pub struct RelayServer {
    config: Arc<RelayConfig>,
    tracker: ConnectionTracker,
    shutdown: Shutdown,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config: Arc::new(config),
            tracker: ConnectionTracker::new(),
            shutdown: Shutdown::new(),
        }
    }

    /// Handle for stopping the server from another task.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Serves until shutdown is triggered, then drains.
    pub async fn run(self, listener: Listener) -> Result<(), ListenerError> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Relay server starting");
        }

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.wait() => break,
                accepted = listener.accept() => accepted,
            };
            let (socket, peer, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(ListenerError::Accept(err)) => {
                    tracing::warn!(error = %err, "Accept failed");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let guard = self.tracker.track();
            let span = tracing::info_span!("connection", id = %guard.id(), peer = %peer);
            let config = Arc::clone(&self.config);
            let shutdown = self.shutdown.clone();
            tokio::spawn(
                async move {
                    let _permit = permit;
                    let _guard = guard;
                    let client = match DuplexStream::from_tcp(socket, config.stream.buffer_limit) {
                        Ok(client) => client,
                        Err(err) => {
                            tracing::warn!(error = %err, "Dropping connection");
                            return;
                        }
                    };
                    if let Err(err) = handler::serve_connection(client, &config, &shutdown).await {
                        tracing::debug!(error = %err, "Connection ended with error");
                    }
                }
                .instrument(span),
            );
        }

        drop(listener);
        let active = self.tracker.active_count();
        tracing::info!(active_connections = active, "Relay server draining");
        if !self.tracker.wait_idle(self.config.timeouts.shutdown_grace()).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Shutdown grace period elapsed with connections still open"
            );
        }
        tracing::info!("Relay server stopped");
        Ok(())
    }
}
