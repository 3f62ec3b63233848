use std::net::SocketAddr;

use crate::error::{BalancerError, Result};

/// Upper bound on the number of simulated servers in one configuration.
pub const MAX_SERVERS: usize = 10_000;

const DEFAULT_MAX_LOG_ENTRIES: usize = 10_000;

/// How the engine treats `client_id` and `priority` on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdmissionPolicy {
    /// `client_id` is a tag; every client and priority is accepted.
    #[default]
    Open,
    /// Clients must exist in the current topology, each one may submit at
    /// most `requests_per_client` requests, and priorities must be positive.
    ClientQuota,
}

/// Engine-level settings that survive `configure` calls.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Checks applied to a submit before the duplicate check
    pub admission: AdmissionPolicy,
    /// Oldest event log entries are evicted past this bound.
    pub max_log_entries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionPolicy::Open,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
        }
    }
}

impl EngineConfig {
    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_max_log_entries(mut self, max_log_entries: usize) -> Self {
        self.max_log_entries = max_log_entries;
        self
    }
}

/// A validated server/client layout, echoed back by `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Topology {
    /// Number of servers, ids `0..servers`
    pub servers: usize,
    /// Number of clients, ids `0..clients`
    pub clients: usize,
    /// Submission budget per client, enforced only under `ClientQuota`
    pub requests_per_client: u64,
}

impl Topology {
    /// Validate raw counts as received from a caller.
    pub fn try_new(num_servers: i64, num_clients: i64, requests_per_client: i64) -> Result<Self> {
        let servers = non_negative("num_servers", num_servers)?;
        let clients = non_negative("num_clients", num_clients)?;
        let requests_per_client = non_negative("requests_per_client", requests_per_client)?;

        if servers > MAX_SERVERS as u64 {
            return Err(BalancerError::InvalidConfiguration(format!(
                "num_servers must be at most {}, got {}",
                MAX_SERVERS, servers
            )));
        }

        let clients = usize::try_from(clients).map_err(|_| {
            BalancerError::InvalidConfiguration(format!("num_clients too large: {}", clients))
        })?;

        Ok(Self {
            servers: servers as usize,
            clients,
            requests_per_client,
        })
    }
}

fn non_negative(field: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        BalancerError::InvalidConfiguration(format!("{} must not be negative, got {}", field, value))
    })
}

/// Top-level settings for a running balancer node.
#[derive(Debug, Clone)]
pub struct BalancerConfig {
    /// Address the HTTP surface binds to
    pub listen_addr: SocketAddr,
    /// Engine settings
    pub engine: EngineConfig,
    /// Applied once at startup, before the HTTP surface accepts calls.
    pub initial_topology: Option<Topology>,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            // SAFETY: This is a hardcoded valid address that will always parse
            listen_addr: "127.0.0.1:5000"
                .parse()
                .expect("default listen address is valid"),
            engine: EngineConfig::default(),
            initial_topology: None,
        }
    }
}

impl BalancerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            ..Default::default()
        }
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.initial_topology = Some(topology);
        self
    }
}
