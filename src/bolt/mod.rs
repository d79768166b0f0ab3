//! Bolt client wrapper: a connection pool plus circuit breaker layered
//! over the `neo4j` driver crate.

pub mod circuit_breaker;
pub mod client;
pub mod statements;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::{BoltClient, BoltRow};

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum BoltError {
    #[error("circuit open for {service}, next probe at {next_probe_at}")]
    CircuitOpen {
        service: String,
        next_probe_at: String,
    },
    #[error("timed out acquiring a pooled connection after {0}s")]
    PoolAcquireTimeout(u64),
    #[error("statement timed out after {0}s")]
    QueryTimeout(u64),
    #[error("driver error: {0}")]
    Driver(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}
