//! Server Implementation
//!
//! HTTP 服务器与 TCP 消息总线的启动和关闭

use std::net::SocketAddr;

use crate::api;
use crate::core::{Config, Result, ServerError, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config),
        };

        state.start_background_tasks();

        // Start Message Bus TCP Server
        let message_bus = state.message_bus.clone();
        tokio::spawn(async move {
            if let Err(e) = message_bus.start_tcp_server().await {
                tracing::error!("Message Bus TCP server failed: {}", e);
            }
        });

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!(
            environment = %self.config.environment,
            "Shop server listening on {}",
            addr
        );

        let app = api::build_app(&state);
        let shutdown_bus = state.message_bus.clone();
        let shutdown = async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            shutdown_bus.shutdown();
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)?;

        // Covers the case where serve returned on its own
        state.message_bus.shutdown();
        Ok(())
    }
}
