//! JSON records exchanged over the HTTP surface.
//!
//! Engine types carry no serde derives; conversion happens here.

use serde::{Deserialize, Serialize};

use crate::balancer::{Request, Server, ServerTransition, SubmitAck};
use crate::config::Topology;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureBody {
    pub num_servers: i64,
    pub num_clients: i64,
    pub requests_per_client: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    pub servers: u64,
    pub clients: u64,
    pub requests_per_client: u64,
}

impl From<Topology> for ConfigureResponse {
    fn from(topology: Topology) -> Self {
        Self {
            servers: topology.servers as u64,
            clients: topology.clients as u64,
            requests_per_client: topology.requests_per_client,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBody {
    pub client_id: u64,
    pub request_id: u64,
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub status: String,
    pub assigned_server: Option<u64>,
}

impl From<SubmitAck> for SubmitResponse {
    fn from(ack: SubmitAck) -> Self {
        Self {
            message: format!("Request {} added successfully!", ack.request_id),
            status: ack.status.to_string(),
            assigned_server: ack.assigned_server,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestView {
    pub client_id: u64,
    pub request_id: u64,
    pub priority: i64,
    pub status: String,
    pub assigned_server: Option<u64>,
}

impl RequestView {
    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }
}

impl From<&Request> for RequestView {
    fn from(request: &Request) -> Self {
        Self {
            client_id: request.client_id,
            request_id: request.request_id,
            priority: request.priority,
            status: request.status.to_string(),
            assigned_server: request.assigned_server,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerView {
    pub server_id: u64,
    pub handled_requests: u64,
    pub active: bool,
}

impl From<&Server> for ServerView {
    fn from(server: &Server) -> Self {
        Self {
            server_id: server.server_id,
            handled_requests: server.handled_requests,
            active: server.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerNotice {
    pub message: String,
    pub requeued: Vec<u64>,
}

impl ServerNotice {
    pub fn down(transition: &ServerTransition) -> Self {
        Self {
            message: format!("Server {} marked as down", transition.server_id),
            requeued: transition.requeued.clone(),
        }
    }

    pub fn up(transition: &ServerTransition) -> Self {
        Self {
            message: format!("Server {} marked as up", transition.server_id),
            requeued: transition.requeued.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
