use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use lb_lite::client::BalancerClient;
use lb_lite::config::{AdmissionPolicy, BalancerConfig, EngineConfig, Topology};
use lb_lite::monitor::{run_monitor, MonitorConfig};
use lb_lite::node::Node;
use lb_lite::shutdown::install_shutdown_handler;
use lb_lite::wire::{LogsResponse, RequestView, ServerNotice, ServerView};

#[derive(Parser, Debug)]
#[command(name = "lb-lite")]
#[command(version)]
#[command(about = "A priority-aware load balancer simulator with failover")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start a load balancer
    Server(ServerArgs),

    /// Poll a running load balancer and print its status
    Monitor {
        #[command(flatten)]
        client: ClientArgs,

        #[command(flatten)]
        monitor: MonitorArgs,
    },

    /// Reset the balancer with a new server/client layout
    Configure {
        #[command(flatten)]
        client: ClientArgs,

        #[arg(long)]
        servers: i64,

        #[arg(long)]
        clients: i64,

        #[arg(long)]
        requests_per_client: i64,
    },

    /// Request commands
    Request {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: RequestCommands,
    },

    /// Server pool commands
    Pool {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: PoolCommands,
    },

    /// Show or export the event log
    Logs {
        #[command(flatten)]
        client: ClientArgs,

        /// Write the full timestamped log to this file instead of printing it
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port to listen on
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Number of servers to configure at startup
    #[arg(long, requires_all = ["clients", "requests_per_client"])]
    servers: Option<i64>,

    /// Number of clients to configure at startup
    #[arg(long, requires = "servers")]
    clients: Option<i64>,

    /// Request budget per client configured at startup
    #[arg(long, requires = "servers")]
    requests_per_client: Option<i64>,

    /// Enforce client ids, per-client budgets and positive priorities
    #[arg(long)]
    client_quota: bool,

    /// Maximum number of event log entries kept in memory
    #[arg(long, default_value = "10000")]
    max_log_entries: usize,
}

// =============================================================================
// Client Arguments (shared by every client command)
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Load balancer address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:5000")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
struct MonitorArgs {
    /// Seconds between polls
    #[arg(long, default_value = "5")]
    interval_secs: u64,

    /// Number of recent log lines to show
    #[arg(long, default_value = "3")]
    log_tail: usize,
}

#[derive(clap::Subcommand, Debug)]
enum RequestCommands {
    /// Submit a request
    Submit {
        #[arg(long)]
        client_id: u64,

        #[arg(long)]
        request_id: u64,

        /// Lower values are served first
        #[arg(long)]
        priority: i64,
    },
    /// List all requests
    List,
}

#[derive(clap::Subcommand, Debug)]
enum PoolCommands {
    /// List servers and their handled request counts
    List,
    /// Simulate a server failure
    Down { server_id: u64 },
    /// Bring a failed server back
    Up { server_id: u64 },
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listen_addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    let admission = if args.client_quota {
        AdmissionPolicy::ClientQuota
    } else {
        AdmissionPolicy::Open
    };
    let engine = EngineConfig::default()
        .with_admission(admission)
        .with_max_log_entries(args.max_log_entries);

    let mut config = BalancerConfig::new(listen_addr).with_engine(engine);
    if let (Some(servers), Some(clients), Some(per_client)) =
        (args.servers, args.clients, args.requests_per_client)
    {
        config = config.with_topology(Topology::try_new(servers, clients, per_client)?);
    }

    tracing::info!(
        listen_addr = %config.listen_addr,
        admission = ?config.engine.admission,
        initial_topology = ?config.initial_topology,
        "Starting lb-lite"
    );

    let shutdown = install_shutdown_handler();
    Node::new(config).run(shutdown).await?;
    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_servers(servers: &[ServerView]) {
    println!("{:<10} {:<10} {:<8}", "SERVER", "HANDLED", "STATE");
    for s in servers {
        println!(
            "{:<10} {:<10} {:<8}",
            s.server_id,
            s.handled_requests,
            if s.active { "up" } else { "down" }
        );
    }
}

fn print_requests(requests: &[RequestView]) {
    println!(
        "{:<10} {:<8} {:<9} {:<10} {:<8}",
        "REQUEST", "CLIENT", "PRIORITY", "STATUS", "SERVER"
    );
    for r in requests {
        let server = r
            .assigned_server
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} {:<8} {:<9} {:<10} {:<8}",
            r.request_id, r.client_id, r.priority, r.status, server
        );
    }
}

fn print_notice(
    notice: &ServerNotice,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => print_json(notice)?,
        OutputFormat::Table => {
            println!("{}", notice.message);
            if !notice.requeued.is_empty() {
                println!("Requeued requests: {:?}", notice.requeued);
            }
        }
    }
    Ok(())
}

async fn handle_request_command(
    client: &BalancerClient,
    command: RequestCommands,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        RequestCommands::Submit {
            client_id,
            request_id,
            priority,
        } => {
            let resp = client.submit(client_id, request_id, priority).await?;
            match output {
                OutputFormat::Json => print_json(&resp)?,
                OutputFormat::Table => {
                    println!("{}", resp.message);
                    match resp.assigned_server {
                        Some(server) => println!("Status: {} (server {})", resp.status, server),
                        None => println!("Status: {}", resp.status),
                    }
                }
            }
        }
        RequestCommands::List => {
            let requests = client.requests().await?;
            match output {
                OutputFormat::Json => print_json(&requests)?,
                OutputFormat::Table => print_requests(&requests),
            }
        }
    }
    Ok(())
}

async fn handle_pool_command(
    client: &BalancerClient,
    command: PoolCommands,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        PoolCommands::List => {
            let servers = client.servers().await?;
            match output {
                OutputFormat::Json => print_json(&servers)?,
                OutputFormat::Table => print_servers(&servers),
            }
        }
        PoolCommands::Down { server_id } => {
            let notice = client.server_down(server_id).await?;
            print_notice(&notice, output)?;
        }
        PoolCommands::Up { server_id } => {
            let notice = client.server_up(server_id).await?;
            print_notice(&notice, output)?;
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Monitor { client, monitor } => {
            let balancer = BalancerClient::new(client.addr)?;
            let config = MonitorConfig {
                interval: Duration::from_secs(monitor.interval_secs),
                log_tail: monitor.log_tail,
            };
            run_monitor(balancer, config, install_shutdown_handler()).await;
        }
        Commands::Configure {
            client,
            servers,
            clients,
            requests_per_client,
        } => {
            let balancer = BalancerClient::new(client.addr.clone())?;
            let resp = balancer
                .configure(servers, clients, requests_per_client)
                .await?;
            match client.output {
                OutputFormat::Json => print_json(&resp)?,
                OutputFormat::Table => println!(
                    "Configured {} servers and {} clients ({} requests per client)",
                    resp.servers, resp.clients, resp.requests_per_client
                ),
            }
        }
        Commands::Request { client, command } => {
            let balancer = BalancerClient::new(client.addr.clone())?;
            handle_request_command(&balancer, command, &client.output).await?;
        }
        Commands::Pool { client, command } => {
            let balancer = BalancerClient::new(client.addr.clone())?;
            handle_pool_command(&balancer, command, &client.output).await?;
        }
        Commands::Logs { client, export } => {
            let balancer = BalancerClient::new(client.addr.clone())?;
            if let Some(path) = export {
                let text = balancer.download_logs().await?;
                tokio::fs::write(&path, text).await?;
                println!("Log written to {}", path.display());
            } else {
                let logs = balancer.logs().await?;
                match client.output {
                    OutputFormat::Json => print_json(&LogsResponse { logs })?,
                    OutputFormat::Table => {
                        for line in logs {
                            println!("{}", line);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
