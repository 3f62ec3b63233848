use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalancerError {
    #[error("Request already exists: {0}")]
    DuplicateRequest(u64),

    #[error("Invalid server ID: {0}")]
    UnknownServer(u64),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid client ID: {0}")]
    UnknownClient(u64),

    #[error("Client {0} has reached max requests")]
    ClientQuotaExhausted(u64),

    #[error("Priority must be greater than zero, got {0}")]
    InvalidPriority(i64),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Balancer rejected the call ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, BalancerError>;
