pub mod clients;
pub mod engine;
pub mod events;
pub mod pool;
pub mod queue;
pub mod request;

pub use engine::{Assignment, BalancerSnapshot, Engine, EngineState, ServerTransition, SubmitAck};
pub use events::{BalancerEvent, EventLog, LogEntry};
pub use pool::{Server, ServerPool};
pub use queue::RequestQueue;
pub use request::{Request, RequestStatus};
