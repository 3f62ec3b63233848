#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Processed,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Processed => write!(f, "processed"),
        }
    }
}

/// A client request as tracked by the balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub client_id: u64,
    pub request_id: u64,
    /// Lower values are served first.
    pub priority: i64,
    pub status: RequestStatus,
    /// Set only while `status` is `Processed`.
    pub assigned_server: Option<u64>,
}

impl Request {
    pub fn new(client_id: u64, request_id: u64, priority: i64) -> Self {
        Self {
            client_id,
            request_id,
            priority,
            status: RequestStatus::Pending,
            assigned_server: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    pub(crate) fn mark_processed(&mut self, server_id: u64) {
        self.status = RequestStatus::Processed;
        self.assigned_server = Some(server_id);
    }

    pub(crate) fn mark_pending(&mut self) {
        self.status = RequestStatus::Pending;
        self.assigned_server = None;
    }
}
