use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::balancer::Engine;
use crate::config::BalancerConfig;
use crate::dashboard::{self, DashboardState};

/// A running balancer: one engine shared by every HTTP handler.
pub struct Node {
    pub config: BalancerConfig,
    pub engine: Arc<Engine>,
}

impl Node {
    pub fn new(config: BalancerConfig) -> Self {
        let engine = Arc::new(Engine::new(config.engine.clone()));
        Self { config, engine }
    }

    /// Apply the initial topology, if any, then serve HTTP on the configured
    /// address until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be bound or the server
    /// fails while running.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.run_on(listener, shutdown).await
    }

    /// Same as [`Node::run`] on an already-bound listener.
    pub async fn run_on(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> std::io::Result<()> {
        if let Some(topology) = self.config.initial_topology {
            self.engine.configure_topology(topology).await;
        }

        tracing::info!(
            addr = %listener.local_addr()?,
            admission = ?self.config.engine.admission,
            "Load balancer listening"
        );

        let state = DashboardState {
            engine: self.engine.clone(),
        };
        dashboard::serve(listener, state, shutdown).await?;

        tracing::info!("Load balancer stopped");
        Ok(())
    }
}
