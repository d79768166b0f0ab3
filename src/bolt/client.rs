//! Pooled, circuit-breaker-guarded wrapper around the `neo4j` Bolt
//! driver crate. The driver crate's query execution is
//! blocking, so calls are dispatched to `spawn_blocking` to keep the
//! async reconcile loop non-blocking.

use super::{BoltError, CircuitBreaker};
use crate::config::Config;
use chrono::Utc;
use neo4j::driver::{auth::AuthToken, ConnectionConfig, Driver, DriverConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tracing::warn;

pub type BoltRow = BTreeMap<String, serde_json::Value>;

/// One pooled, circuit-breaker-wrapped connection to a single cluster's
/// client Service.
pub struct BoltClient {
    driver: Arc<Driver>,
    semaphore: Arc<Semaphore>,
    acquire_timeout: Duration,
    query_timeout: Duration,
    breaker: Arc<Mutex<CircuitBreaker>>,
    service: String,
}

impl BoltClient {
    /// Builds a client against `bolt://<service>:7687`. Credentials are
    /// read once at construction time from the admin Secret (or its
    /// `auth.adminSecret` override) by the caller and passed in here;
    /// refreshing on auth failure is driven by `refresh_auth`.
    pub fn new(service: &str, username: &str, password: &str, cfg: &Config) -> Result<Self, BoltError> {
        let uri = format!("bolt://{service}:7687");
        let connection_config: ConnectionConfig = uri
            .parse()
            .map_err(|e| BoltError::Driver(format!("invalid bolt uri {uri}: {e}")))?;
        let auth = AuthToken::new_basic_auth(username, password);
        let driver_config = DriverConfig::new()
            .with_auth(Arc::new(auth))
            .with_fetch_size(1000)
            .map_err(|e| BoltError::Driver(format!("invalid fetch size: {e}")))?;
        let driver = Driver::new(connection_config, driver_config);
        Ok(Self {
            driver: Arc::new(driver),
            semaphore: Arc::new(Semaphore::new(cfg.bolt_pool_max_size)),
            acquire_timeout: Duration::from_secs(cfg.bolt_acquire_timeout_secs),
            query_timeout: Duration::from_secs(cfg.bolt_query_timeout_secs),
            breaker: Arc::new(Mutex::new(CircuitBreaker::new(
                cfg.circuit_breaker_failure_threshold,
                cfg.circuit_breaker_window_secs,
                cfg.circuit_breaker_probe_interval_secs,
            ))),
            service: service.to_string(),
        })
    }

    /// Runs one statement, honoring the circuit breaker, connection
    /// pool, and per-call query timeout (default from `Config`,
    /// overridable via `timeout`).
    pub async fn run(
        &self,
        query: &str,
        params: BTreeMap<String, serde_json::Value>,
        timeout: Option<Duration>,
    ) -> Result<Vec<BoltRow>, BoltError> {
        let now = Utc::now();
        {
            let mut breaker = self.breaker.lock().await;
            if !breaker.allow_request(now) {
                return Err(BoltError::CircuitOpen {
                    service: self.service.clone(),
                    next_probe_at: breaker
                        .next_probe_at()
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default(),
                });
            }
        }

        let permit = tokio::time::timeout(self.acquire_timeout, self.semaphore.acquire())
            .await
            .map_err(|_| BoltError::PoolAcquireTimeout(self.acquire_timeout.as_secs()))?
            .map_err(|_| BoltError::Driver("connection pool closed".into()))?;

        let query_timeout = timeout.unwrap_or(self.query_timeout);
        let driver = self.driver.clone();
        let query = query.to_string();
        let fut = tokio::task::spawn_blocking(move || run_blocking(&driver, &query, params));
        let result = tokio::time::timeout(query_timeout, fut).await;
        drop(permit);

        let mut breaker = self.breaker.lock().await;
        match result {
            Ok(Ok(Ok(rows))) => {
                breaker.on_success(Utc::now());
                Ok(rows)
            }
            Ok(Ok(Err(e))) => {
                breaker.on_failure(Utc::now());
                warn!(service = %self.service, error = %e, "bolt statement failed");
                Err(e)
            }
            Ok(Err(join_err)) => {
                breaker.on_failure(Utc::now());
                Err(BoltError::Driver(join_err.to_string()))
            }
            Err(_) => {
                breaker.on_failure(Utc::now());
                Err(BoltError::QueryTimeout(query_timeout.as_secs()))
            }
        }
    }
}

fn run_blocking(
    driver: &Driver,
    query: &str,
    params: BTreeMap<String, serde_json::Value>,
) -> Result<Vec<BoltRow>, BoltError> {
    let result = driver
        .execute_query(query)
        .with_parameters(params)
        .run()
        .map_err(|e| BoltError::Driver(e.to_string()))?;
    Ok(result
        .records
        .into_iter()
        .map(|record| record.into_iter().map(|(k, v)| (k, value_to_json(v))).collect())
        .collect())
}

fn value_to_json(value: neo4j::value::ValueReceive) -> serde_json::Value {
    use neo4j::value::ValueReceive;
    match value {
        ValueReceive::Null => serde_json::Value::Null,
        ValueReceive::Boolean(b) => serde_json::Value::Bool(b),
        ValueReceive::Integer(i) => serde_json::json!(i),
        ValueReceive::Float(f) => serde_json::json!(f),
        ValueReceive::String(s) => serde_json::Value::String(s),
        ValueReceive::List(items) => serde_json::Value::Array(items.into_iter().map(value_to_json).collect()),
        other => serde_json::Value::String(format!("{other:?}")),
    }
}
