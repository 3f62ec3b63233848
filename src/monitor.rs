//! Polling status display for a running balancer.

use std::fmt::Write as _;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::BalancerClient;
use crate::error::Result;
use crate::wire::{RequestView, ServerView};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    /// How many of the most recent log lines to show.
    pub log_tail: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            log_tail: 3,
        }
    }
}

/// Fetch servers, requests and logs once and render them. Fetch failures are
/// rendered in place of the section that failed.
pub async fn poll_once(client: &BalancerClient, config: &MonitorConfig) -> String {
    let (servers, requests, logs) =
        tokio::join!(client.servers(), client.requests(), client.logs());
    render_status(servers, requests, logs, config.log_tail)
}

pub fn render_status(
    servers: Result<Vec<ServerView>>,
    requests: Result<Vec<RequestView>>,
    logs: Result<Vec<String>>,
    log_tail: usize,
) -> String {
    let mut out = String::from("\nLoad Balancer Status:\n");

    match servers {
        Ok(servers) => {
            let _ = writeln!(out, "Servers:");
            for s in servers {
                let _ = writeln!(
                    out,
                    "  server {:<4} handled={:<6} {}",
                    s.server_id,
                    s.handled_requests,
                    if s.active { "UP" } else { "DOWN" }
                );
            }
        }
        Err(e) => {
            let _ = writeln!(out, "Servers: error: {}", e);
        }
    }

    match requests {
        Ok(requests) => {
            let pending: Vec<&RequestView> = requests.iter().filter(|r| r.is_pending()).collect();
            let _ = writeln!(
                out,
                "Pending Requests: {} of {}",
                pending.len(),
                requests.len()
            );
            for r in pending {
                let _ = writeln!(
                    out,
                    "  request {:<6} client={:<4} priority={}",
                    r.request_id, r.client_id, r.priority
                );
            }
        }
        Err(e) => {
            let _ = writeln!(out, "Pending Requests: error: {}", e);
        }
    }

    match logs {
        Ok(logs) => {
            let _ = writeln!(out, "Logs:");
            let skip = logs.len().saturating_sub(log_tail);
            for line in logs.iter().skip(skip) {
                let _ = writeln!(out, "  {}", line);
            }
        }
        Err(e) => {
            let _ = writeln!(out, "Logs: error: {}", e);
        }
    }

    out
}

/// Print the status every `config.interval` until `shutdown` fires.
pub async fn run_monitor(
    client: BalancerClient,
    config: MonitorConfig,
    shutdown: CancellationToken,
) {
    tracing::info!(addr = client.base_url(), interval = ?config.interval, "Monitoring load balancer");

    loop {
        let status = tokio::select! {
            status = poll_once(&client, &config) => status,
            _ = shutdown.cancelled() => break,
        };
        println!("{}", status);

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = shutdown.cancelled() => break,
        }
    }

    println!("Load Balancer monitoring stopped.");
}
