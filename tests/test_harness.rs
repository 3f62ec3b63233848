//! Test harness for running a real load balancer on an ephemeral port.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lb_lite::balancer::Engine;
use lb_lite::client::BalancerClient;
use lb_lite::config::{BalancerConfig, EngineConfig, Topology};
use lb_lite::node::Node;

/// Handle to a running test balancer
pub struct TestBalancer {
    pub addr: SocketAddr,
    pub engine: Arc<Engine>,
    shutdown: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestBalancer {
    pub async fn start(topology: Option<Topology>) -> Self {
        Self::start_with(EngineConfig::default(), topology).await
    }

    pub async fn start_with(engine: EngineConfig, topology: Option<Topology>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = BalancerConfig::new(addr).with_engine(engine);
        if let Some(topology) = topology {
            config = config.with_topology(topology);
        }

        let node = Node::new(config);
        let engine = node.engine.clone();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(node.run_on(listener, shutdown.clone()));

        let balancer = Self {
            addr,
            engine,
            shutdown,
            handle,
        };
        if topology.is_some() {
            let engine = balancer.engine.clone();
            assert_eventually(
                || {
                    let engine = engine.clone();
                    async move { engine.topology().await == topology.unwrap_or_default() }
                },
                Duration::from_secs(5),
                "initial topology was not applied",
            )
            .await;
        }
        balancer
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn client(&self) -> BalancerClient {
        BalancerClient::new(self.url()).unwrap()
    }

    /// Stop the server and wait for it to drain.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("balancer did not stop in time")
            .unwrap()
            .unwrap();
    }
}

/// Poll `condition` until it holds or `timeout_duration` elapses.
pub async fn wait_for<F, Fut>(condition: F, timeout_duration: Duration, poll: Duration) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout_duration;
    loop {
        if condition().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(poll).await;
    }
}

pub async fn assert_eventually<F, Fut>(condition: F, timeout_duration: Duration, message: &str)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let result = wait_for(condition, timeout_duration, Duration::from_millis(20)).await;
    assert!(result, "{}", message);
}
