use tokio::sync::{RwLock, RwLockReadGuard};

use crate::balancer::clients::ClientLedger;
use crate::balancer::events::{BalancerEvent, EventLog, LogEntry};
use crate::balancer::pool::{Server, ServerPool};
use crate::balancer::queue::RequestQueue;
use crate::balancer::request::{Request, RequestStatus};
use crate::config::{AdmissionPolicy, EngineConfig, Topology};
use crate::error::{BalancerError, Result};

/// One request handed to one server during a dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub request_id: u64,
    pub server_id: u64,
}

/// Outcome of a successful submit, taken after the dispatch pass it triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitAck {
    pub request_id: u64,
    /// `Processed` if the request found a server in the same call
    pub status: RequestStatus,
    /// Server holding the request, `None` while pending
    pub assigned_server: Option<u64>,
}

/// Outcome of a server failure or recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTransition {
    pub server_id: u64,
    /// False when the server was already in the requested state.
    pub changed: bool,
    /// Requests pulled back from the server, ascending.
    pub requeued: Vec<u64>,
    pub assignments: Vec<Assignment>,
}

/// Consistent point-in-time view of the whole balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancerSnapshot {
    /// Layout of the current epoch
    pub topology: Topology,
    /// Servers in id order
    pub servers: Vec<Server>,
    /// Requests of the epoch in submission order, pending and processed
    pub requests: Vec<Request>,
}

/// Queue, pool, client budgets and event log of one balancer. Every method
/// runs to completion; callers serialize access through [`Engine`].
#[derive(Debug)]
pub struct EngineState {
    admission: AdmissionPolicy,
    topology: Topology,
    queue: RequestQueue,
    pool: ServerPool,
    clients: ClientLedger,
    events: EventLog,
}

impl EngineState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            admission: config.admission,
            topology: Topology::default(),
            queue: RequestQueue::new(),
            pool: ServerPool::default(),
            clients: ClientLedger::default(),
            events: EventLog::new(config.max_log_entries),
        }
    }

    /// Start a new configuration epoch. All requests, servers and client
    /// budgets are discarded; the event log is kept.
    pub fn configure(&mut self, topology: Topology) -> Topology {
        self.topology = topology;
        self.queue = RequestQueue::new();
        self.pool.configure(topology.servers);
        self.clients = ClientLedger::new(topology.clients, topology.requests_per_client);
        self.events.record(BalancerEvent::Configured {
            servers: topology.servers,
            clients: topology.clients,
        });
        topology
    }

    pub fn submit(&mut self, client_id: u64, request_id: u64, priority: i64) -> Result<SubmitAck> {
        if self.admission == AdmissionPolicy::ClientQuota {
            self.clients.check(client_id)?;
            if priority <= 0 {
                return Err(BalancerError::InvalidPriority(priority));
            }
        }
        if self.queue.contains(request_id) {
            return Err(BalancerError::DuplicateRequest(request_id));
        }

        self.queue
            .enqueue(Request::new(client_id, request_id, priority))?;
        if self.admission == AdmissionPolicy::ClientQuota {
            self.clients.consume(client_id)?;
        }
        self.events.record(BalancerEvent::RequestQueued {
            request_id,
            client_id,
            priority,
        });

        self.dispatch_pass()?;

        let request = self.queue.get(request_id).ok_or_else(|| {
            BalancerError::Internal(format!("request {} vanished after enqueue", request_id))
        })?;
        Ok(SubmitAck {
            request_id,
            status: request.status,
            assigned_server: request.assigned_server,
        })
    }

    /// Drain the backlog into active servers until it is empty or no server
    /// is left to take work. An `Internal` error means the pool rejected a
    /// target it had just selected; the request is back in the queue.
    pub fn dispatch_pass(&mut self) -> Result<Vec<Assignment>> {
        let mut assignments = Vec::new();

        while let Some(request) = self.queue.dequeue_best() {
            let Some(server_id) = self.pool.select_target() else {
                self.queue.requeue(request.request_id);
                self.events.record(BalancerEvent::RequestDelayed {
                    request_id: request.request_id,
                });
                break;
            };

            assignments.push(self.assign(request.request_id, server_id)?);
        }

        Ok(assignments)
    }

    /// Hand a dequeued request to `server_id`, or put it back on failure.
    fn assign(&mut self, request_id: u64, server_id: u64) -> Result<Assignment> {
        if let Err(err) = self.pool.record_assignment(server_id, request_id) {
            self.queue.requeue(request_id);
            return Err(err);
        }
        self.queue.mark_processed(request_id, server_id);
        self.events.record(BalancerEvent::RequestAssigned {
            request_id,
            server_id,
        });
        Ok(Assignment {
            request_id,
            server_id,
        })
    }

    /// Take a server out of rotation and hand its requests to the rest of the
    /// pool.
    pub fn fail_server(&mut self, server_id: u64) -> Result<ServerTransition> {
        let was_active = self
            .pool
            .get(server_id)
            .map(|s| s.active)
            .ok_or(BalancerError::UnknownServer(server_id))?;

        let affected = self.pool.mark_down(server_id)?;
        if was_active {
            self.events.record(BalancerEvent::ServerDown {
                server_id,
                requeued: affected.len(),
            });
        } else {
            tracing::debug!(server_id, "Server already down");
        }

        for &request_id in &affected {
            if self.queue.requeue(request_id) {
                self.events.record(BalancerEvent::RequestRequeued {
                    request_id,
                    server_id,
                });
            } else {
                tracing::error!(request_id, server_id, "Failed to requeue request of failed server");
            }
        }

        let assignments = self.dispatch_pass()?;
        Ok(ServerTransition {
            server_id,
            changed: was_active,
            requeued: affected,
            assignments,
        })
    }

    /// Put a server back into rotation and let the backlog drain into it.
    pub fn recover_server(&mut self, server_id: u64) -> Result<ServerTransition> {
        let changed = self.pool.mark_up(server_id)?;
        if changed {
            self.events.record(BalancerEvent::ServerUp { server_id });
        } else {
            tracing::debug!(server_id, "Server already active");
        }

        let assignments = self.dispatch_pass()?;
        Ok(ServerTransition {
            server_id,
            changed,
            requeued: Vec::new(),
            assignments,
        })
    }

    pub fn snapshot(&self) -> BalancerSnapshot {
        BalancerSnapshot {
            topology: self.topology,
            servers: self.pool.snapshot().collect(),
            requests: self.queue.snapshot().copied().collect(),
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    pub fn clients(&self) -> &ClientLedger {
        &self.clients
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }
}

/// Shared load balancer engine. Mutations take the write lock for their full
/// duration, dispatch included; reports take the read lock.
#[derive(Debug)]
pub struct Engine {
    state: RwLock<EngineState>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: RwLock::new(EngineState::new(&config)),
        }
    }

    /// Validate the counts and start a new configuration epoch.
    pub async fn configure(
        &self,
        num_servers: i64,
        num_clients: i64,
        requests_per_client: i64,
    ) -> Result<Topology> {
        let topology = Topology::try_new(num_servers, num_clients, requests_per_client)?;
        Ok(self.state.write().await.configure(topology))
    }

    pub async fn configure_topology(&self, topology: Topology) -> Topology {
        self.state.write().await.configure(topology)
    }

    pub async fn submit(&self, client_id: u64, request_id: u64, priority: i64) -> Result<SubmitAck> {
        self.state
            .write()
            .await
            .submit(client_id, request_id, priority)
    }

    pub async fn dispatch_pass(&self) -> Result<Vec<Assignment>> {
        self.state.write().await.dispatch_pass()
    }

    pub async fn fail_server(&self, server_id: u64) -> Result<ServerTransition> {
        self.state.write().await.fail_server(server_id)
    }

    pub async fn recover_server(&self, server_id: u64) -> Result<ServerTransition> {
        self.state.write().await.recover_server(server_id)
    }

    pub async fn list_requests(&self) -> Vec<Request> {
        self.state.read().await.queue.snapshot().copied().collect()
    }

    pub async fn list_servers(&self) -> Vec<Server> {
        self.state.read().await.pool.snapshot().collect()
    }

    pub async fn snapshot(&self) -> BalancerSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn topology(&self) -> Topology {
        self.state.read().await.topology
    }

    pub async fn logs(&self) -> Vec<LogEntry> {
        self.state.read().await.events.entries().cloned().collect()
    }

    pub async fn log_messages(&self) -> Vec<String> {
        self.state.read().await.events.messages()
    }

    /// Full event log as text, one `"<timestamp> - <message>"` line per entry.
    pub async fn render_log(&self) -> String {
        self.state.read().await.events.render()
    }

    /// Shared read access for callers that need several views at once.
    pub async fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().await
    }
}
