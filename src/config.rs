use std::env;

/// Operator-wide tunables. Per-resource fields (`UpgradeStrategy`,
/// `storage.retentionPolicy`, per-Backup `schedule`, ...) always take
/// precedence over these defaults; this struct only supplies the
/// fallback when a resource omits them.
#[derive(Clone, Debug)]
pub struct Config {
    /// Seconds between periodic drift-detection requeues.
    pub reconcile_ttl: u64,
    /// Jitter ceiling added on top of `reconcile_ttl`, in seconds.
    pub reconcile_jitter_max: u64,
    /// Max pooled Bolt connections per cluster client service.
    pub bolt_pool_max_size: usize,
    /// Seconds to wait for a pooled Bolt connection before failing.
    pub bolt_acquire_timeout_secs: u64,
    /// Default per-statement Bolt query timeout, in seconds.
    pub bolt_query_timeout_secs: u64,
    /// Consecutive Bolt failures before the circuit breaker trips open.
    pub circuit_breaker_failure_threshold: u32,
    /// Sliding window, in seconds, over which failures are counted.
    pub circuit_breaker_window_secs: u64,
    /// Seconds an open circuit waits before allowing a half-open probe.
    pub circuit_breaker_probe_interval_secs: u64,
    /// Default rolling-upgrade per-step pod health check timeout, in seconds.
    pub upgrade_health_check_timeout_secs: u64,
    /// Default rolling-upgrade post-step quorum stabilization timeout, in seconds.
    pub upgrade_stabilization_timeout_secs: u64,
    /// Default whole-upgrade wall-clock budget, in seconds.
    pub upgrade_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reconcile_ttl: from_env_default("RECONCILE_TTL", "30").parse().unwrap(),
            reconcile_jitter_max: from_env_default("RECONCILE_JITTER_MAX", "15")
                .parse()
                .unwrap(),
            bolt_pool_max_size: from_env_default("BOLT_POOL_MAX_SIZE", "20")
                .parse()
                .unwrap(),
            bolt_acquire_timeout_secs: from_env_default("BOLT_ACQUIRE_TIMEOUT_SECS", "5")
                .parse()
                .unwrap(),
            bolt_query_timeout_secs: from_env_default("BOLT_QUERY_TIMEOUT_SECS", "10")
                .parse()
                .unwrap(),
            circuit_breaker_failure_threshold: from_env_default(
                "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
                "5",
            )
            .parse()
            .unwrap(),
            circuit_breaker_window_secs: from_env_default("CIRCUIT_BREAKER_WINDOW_SECS", "30")
                .parse()
                .unwrap(),
            circuit_breaker_probe_interval_secs: from_env_default(
                "CIRCUIT_BREAKER_PROBE_INTERVAL_SECS",
                "30",
            )
            .parse()
            .unwrap(),
            upgrade_health_check_timeout_secs: from_env_default(
                "UPGRADE_HEALTH_CHECK_TIMEOUT_SECS",
                "300",
            )
            .parse()
            .unwrap(),
            upgrade_stabilization_timeout_secs: from_env_default(
                "UPGRADE_STABILIZATION_TIMEOUT_SECS",
                "180",
            )
            .parse()
            .unwrap(),
            upgrade_timeout_secs: from_env_default("UPGRADE_TIMEOUT_SECS", "1800")
                .parse()
                .unwrap(),
        }
    }
}

// Source the variable from the env - use default if not set
fn from_env_default(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_owned())
}
