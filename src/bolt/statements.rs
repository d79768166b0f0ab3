//! Cypher statement builders. Kept free of any driver type
//! so they can be unit tested without a live session.

use crate::version::Neo4jVersion;
use std::collections::BTreeMap;

pub const SHOW_DATABASES: &str = "SHOW DATABASES";
pub const SHOW_DATABASES_BY_NAME: &str = "SHOW DATABASES WHERE name = $name";
pub const SHOW_SERVERS: &str = "SHOW SERVERS";
pub const CLUSTER_OVERVIEW: &str = "CALL dbms.cluster.overview()";
pub const CLEAR_AUTH_CACHE: &str = "CALL dbms.security.clearAuthCache()";
pub const REGISTER_FLEET_TOKEN: &str = "CALL fleetManagement.registerToken($token)";

pub fn await_indexes(timeout_ms: u64) -> (String, BTreeMap<String, serde_json::Value>) {
    let mut params = BTreeMap::new();
    params.insert("timeout".to_string(), serde_json::json!(timeout_ms));
    ("CALL db.awaitIndexes($timeout)".to_string(), params)
}

pub fn checkpoint() -> &'static str {
    "CALL db.checkpoint()"
}

pub fn drop_database(name: &str, if_exists: bool) -> String {
    if if_exists {
        format!("DROP DATABASE {name} IF EXISTS")
    } else {
        format!("DROP DATABASE {name}")
    }
}

pub fn start_database(name: &str) -> String {
    format!("START DATABASE {name}")
}

pub fn stop_database(name: &str) -> String {
    format!("STOP DATABASE {name}")
}

/// Topology clause shared by all `CREATE DATABASE` variants below.
fn topology_clause(primaries: Option<i32>, secondaries: Option<i32>) -> String {
    match (primaries, secondaries) {
        (Some(p), Some(s)) => format!(" TOPOLOGY {p} PRIMARIES {s} SECONDARIES"),
        _ => String::new(),
    }
}

/// Plain `CREATE DATABASE` with no seed.
pub fn create_database_plain(name: &str, primaries: Option<i32>, secondaries: Option<i32>) -> String {
    format!("CREATE DATABASE {name}{}", topology_clause(primaries, secondaries))
}

/// `CREATE DATABASE ... OPTIONS { storage: { uri: ..., credentials: ..., restoreUntil: ... } }`
///. `restore_until` must only be
/// passed on CalVer targets; callers are responsible for enforcing that
/// gate before calling this (validated in `validation::validate_database`
/// together with the version check at the reconciler).
pub fn create_database_from_seed(
    name: &str,
    primaries: Option<i32>,
    secondaries: Option<i32>,
    uri: &str,
    has_credentials: bool,
    restore_until: Option<&str>,
) -> (String, BTreeMap<String, serde_json::Value>) {
    let mut params = BTreeMap::new();
    params.insert("uri".to_string(), serde_json::json!(uri));
    let mut options = vec!["uri: $uri".to_string()];
    if has_credentials {
        options.push("credentials: $credentials".to_string());
    }
    if let Some(ru) = restore_until {
        params.insert("restoreUntil".to_string(), serde_json::json!(ru));
        options.push("restoreUntil: $restoreUntil".to_string());
    }
    let stmt = format!(
        "CREATE DATABASE {name}{} OPTIONS {{ storage: {{ {} }} }}",
        topology_clause(primaries, secondaries),
        options.join(", ")
    );
    (stmt, params)
}

/// Version-gated `dbms.cluster.discovery.version` / service-port-name
/// config pair.
pub fn discovery_config_keys(version: &Neo4jVersion) -> Vec<(&'static str, &'static str)> {
    match version {
        Neo4jVersion::SemVer { major: 5, minor, .. } if *minor == 26 => vec![
            ("dbms.cluster.discovery.version", "V2_ONLY"),
            ("dbms.kubernetes.discovery.v2.service_port_name", "tcp-discovery"),
        ],
        _ => vec![("dbms.kubernetes.discovery.service_port_name", "tcp-discovery")],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_plain_has_no_topology_clause() {
        assert_eq!(create_database_plain("orders", None, None), "CREATE DATABASE orders");
    }

    #[test]
    fn create_with_topology() {
        assert_eq!(
            create_database_plain("orders", Some(2), Some(1)),
            "CREATE DATABASE orders TOPOLOGY 2 PRIMARIES 1 SECONDARIES"
        );
    }

    #[test]
    fn create_from_seed_includes_credentials_and_restore_until() {
        let (stmt, params) = create_database_from_seed(
            "orders",
            Some(2),
            Some(1),
            "s3://bkt/orders.backup",
            true,
            Some("2026-01-01T00:00:00Z"),
        );
        assert!(stmt.contains("TOPOLOGY 2 PRIMARIES 1 SECONDARIES"));
        assert!(stmt.contains("credentials: $credentials"));
        assert!(stmt.contains("restoreUntil: $restoreUntil"));
        assert_eq!(params.get("uri").unwrap(), "s3://bkt/orders.backup");
    }

    #[test]
    fn drop_database_if_exists() {
        assert_eq!(drop_database("orders", true), "DROP DATABASE orders IF EXISTS");
    }
}
