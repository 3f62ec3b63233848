use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// A state transition worth telling an operator about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalancerEvent {
    Configured {
        servers: usize,
        clients: usize,
    },
    RequestQueued {
        request_id: u64,
        client_id: u64,
        priority: i64,
    },
    RequestAssigned {
        request_id: u64,
        server_id: u64,
    },
    RequestDelayed {
        request_id: u64,
    },
    ServerDown {
        server_id: u64,
        requeued: usize,
    },
    RequestRequeued {
        request_id: u64,
        server_id: u64,
    },
    ServerUp {
        server_id: u64,
    },
}

impl fmt::Display for BalancerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalancerEvent::Configured { servers, clients } => write!(
                f,
                "System configured with {} servers and {} clients.",
                servers, clients
            ),
            BalancerEvent::RequestQueued {
                request_id,
                client_id,
                priority,
            } => write!(
                f,
                "Request {} from Client {} added to queue with priority {}",
                request_id, client_id, priority
            ),
            BalancerEvent::RequestAssigned {
                request_id,
                server_id,
            } => write!(f, "Request {} assigned to Server {}", request_id, server_id),
            BalancerEvent::RequestDelayed { request_id } => write!(
                f,
                "No active servers available. Request {} delayed.",
                request_id
            ),
            BalancerEvent::ServerDown {
                server_id,
                requeued,
            } => write!(
                f,
                "Server {} is DOWN. {} request(s) requeued.",
                server_id, requeued
            ),
            BalancerEvent::RequestRequeued {
                request_id,
                server_id,
            } => write!(
                f,
                "Request {} requeued after Server {} failed",
                request_id, server_id
            ),
            BalancerEvent::ServerUp { server_id } => {
                write!(f, "Server {} is BACK ONLINE.", server_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.message
        )
    }
}

/// Bounded, append-only record of balancer events in the order they happened.
#[derive(Debug)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl EventLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn record(&mut self, event: BalancerEvent) {
        match &event {
            BalancerEvent::Configured { servers, clients } => {
                tracing::info!(servers, clients, "System configured");
            }
            BalancerEvent::RequestQueued {
                request_id,
                client_id,
                priority,
            } => {
                tracing::info!(request_id, client_id, priority, "Request queued");
            }
            BalancerEvent::RequestAssigned {
                request_id,
                server_id,
            } => {
                tracing::info!(request_id, server_id, "Request assigned");
            }
            BalancerEvent::RequestDelayed { request_id } => {
                tracing::warn!(request_id, "No active servers, request delayed");
            }
            BalancerEvent::ServerDown {
                server_id,
                requeued,
            } => {
                tracing::warn!(server_id, requeued, "Server down");
            }
            BalancerEvent::RequestRequeued {
                request_id,
                server_id,
            } => {
                tracing::info!(request_id, server_id, "Request requeued");
            }
            BalancerEvent::ServerUp { server_id } => {
                tracing::info!(server_id, "Server back online");
            }
        }

        if self.max_entries == 0 {
            return;
        }
        while self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Utc::now(),
            message: event.to_string(),
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> + Clone + '_ {
        self.entries.iter()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    /// Full text view, one timestamped line per entry.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}\n", entry))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_messages() {
        assert_eq!(
            BalancerEvent::Configured {
                servers: 3,
                clients: 2
            }
            .to_string(),
            "System configured with 3 servers and 2 clients."
        );
        assert_eq!(
            BalancerEvent::RequestAssigned {
                request_id: 7,
                server_id: 1
            }
            .to_string(),
            "Request 7 assigned to Server 1"
        );
        assert_eq!(
            BalancerEvent::ServerUp { server_id: 0 }.to_string(),
            "Server 0 is BACK ONLINE."
        );
    }

    #[test]
    fn records_in_order() {
        let mut log = EventLog::new(10);
        log.record(BalancerEvent::ServerDown {
            server_id: 0,
            requeued: 0,
        });
        log.record(BalancerEvent::ServerUp { server_id: 0 });

        let messages = log.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Server 0 is DOWN"));
        assert_eq!(messages[1], "Server 0 is BACK ONLINE.");
    }

    #[test]
    fn evicts_oldest_past_bound() {
        let mut log = EventLog::new(2);
        for request_id in 1..=3 {
            log.record(BalancerEvent::RequestDelayed { request_id });
        }
        assert_eq!(log.len(), 2);
        assert!(log.messages()[0].contains("Request 2"));
        assert!(log.messages()[1].contains("Request 3"));
    }

    #[test]
    fn zero_bound_keeps_nothing() {
        let mut log = EventLog::new(0);
        log.record(BalancerEvent::ServerUp { server_id: 1 });
        assert!(log.is_empty());
    }

    #[test]
    fn render_prefixes_timestamps() {
        let mut log = EventLog::new(4);
        log.record(BalancerEvent::ServerUp { server_id: 2 });
        let text = log.render();
        assert!(text.ends_with(" - Server 2 is BACK ONLINE.\n"));
        assert_eq!(text.lines().count(), 1);
    }
}
