use std::collections::BTreeSet;

use crate::error::{BalancerError, Result};

/// Read-only view of a server, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Server {
    pub server_id: u64,
    pub handled_requests: u64,
    pub active: bool,
}

/// Server state tracking
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Position in the pool, assigned at configure
    pub id: u64,
    /// Historical count; never decremented, even when work is pulled back.
    pub handled_requests: u64,
    /// Whether the server may receive new assignments
    pub active: bool,
    /// Requests currently held by this server, cleared when it goes down
    pub assigned_requests: BTreeSet<u64>,
}

impl ServerState {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            handled_requests: 0,
            active: true,
            assigned_requests: BTreeSet::new(),
        }
    }

    pub fn view(&self) -> Server {
        Server {
            server_id: self.id,
            handled_requests: self.handled_requests,
            active: self.active,
        }
    }
}

/// Fixed-size set of servers for one configuration epoch.
#[derive(Debug, Default)]
pub struct ServerPool {
    servers: Vec<ServerState>,
}

impl ServerPool {
    pub fn new(count: usize) -> Self {
        let mut pool = Self::default();
        pool.configure(count);
        pool
    }

    /// Replace every server with `count` fresh, active ones.
    pub fn configure(&mut self, count: usize) {
        self.servers = (0..count as u64).map(ServerState::new).collect();
        tracing::debug!(servers = count, "Server pool configured");
    }

    /// Active server with the fewest handled requests, lowest id on ties.
    pub fn select_target(&self) -> Option<u64> {
        self.servers
            .iter()
            .filter(|s| s.active)
            .min_by_key(|s| (s.handled_requests, s.id))
            .map(|s| s.id)
    }

    /// Count an assignment against `server_id` and attribute the request to it.
    pub fn record_assignment(&mut self, server_id: u64, request_id: u64) -> Result<()> {
        match self.server_mut(server_id) {
            Some(server) if server.active => {
                server.handled_requests += 1;
                server.assigned_requests.insert(request_id);
                Ok(())
            }
            Some(_) => {
                tracing::error!(server_id, request_id, "Assignment recorded on inactive server");
                Err(BalancerError::Internal(format!(
                    "server {} is not active",
                    server_id
                )))
            }
            None => {
                tracing::error!(server_id, request_id, "Assignment recorded on unknown server");
                Err(BalancerError::Internal(format!(
                    "server {} does not exist",
                    server_id
                )))
            }
        }
    }

    /// Deactivate a server. Returns the requests it was holding, ascending.
    pub fn mark_down(&mut self, server_id: u64) -> Result<Vec<u64>> {
        let server = self
            .server_mut(server_id)
            .ok_or(BalancerError::UnknownServer(server_id))?;
        server.active = false;
        let affected = std::mem::take(&mut server.assigned_requests);
        Ok(affected.into_iter().collect())
    }

    /// Reactivate a server. Returns whether it was down before.
    pub fn mark_up(&mut self, server_id: u64) -> Result<bool> {
        let server = self
            .server_mut(server_id)
            .ok_or(BalancerError::UnknownServer(server_id))?;
        let changed = !server.active;
        server.active = true;
        Ok(changed)
    }

    pub fn get(&self, server_id: u64) -> Option<&ServerState> {
        usize::try_from(server_id)
            .ok()
            .and_then(|idx| self.servers.get(idx))
    }

    fn server_mut(&mut self, server_id: u64) -> Option<&mut ServerState> {
        usize::try_from(server_id)
            .ok()
            .and_then(|idx| self.servers.get_mut(idx))
    }

    /// All servers in id order.
    pub fn snapshot(&self) -> impl Iterator<Item = Server> + Clone + '_ {
        self.servers.iter().map(ServerState::view)
    }

    pub fn active_count(&self) -> usize {
        self.servers.iter().filter(|s| s.active).count()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
