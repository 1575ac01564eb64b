//! Live connections: driver seam, health checks, circuit breaker and pool.

mod breaker;
mod driver;
mod health;
mod manager;
mod options;

pub use breaker::{BreakerState, CircuitBreaker, CircuitBreakerState};
pub use driver::{DatabaseClient, DatabaseDriver, MongoClient, MongoDriver};
pub use health::{ClusterRole, ConnectionHealth, ServerStatus, Topology, build_version, derive_topology};
pub use manager::{ConnectionManager, ManagerConfig};
pub use options::ResolvedOptions;
