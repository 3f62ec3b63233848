pub mod balancer;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod monitor;
pub mod node;
pub mod shutdown;
pub mod wire;
