//! Admission-style validation, invoked defensively at the top of each
//! reconcile and (out of scope here) by the webhook HTTP handlers.

use crate::apis::{
    cluster_types::EnterpriseClusterSpec, database_types::DatabaseSpec, restore_types::RestoreSpec,
};
use crate::errors::ValidationError;
use crate::version::Neo4jVersion;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Schemes accepted for `Neo4jDatabase.spec.seedURI.uri`.
    static ref SOURCE_URI_SCHEME: Regex = Regex::new(r"^(s3|gs|azb|https|http|ftp)://").unwrap();
}

fn validate_source_uri(uri: &str) -> Result<(), ValidationError> {
    if SOURCE_URI_SCHEME.is_match(uri) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedSourceUriScheme(uri.to_string()))
    }
}

/// Config keys the operator manages; users may not set them.
pub const FORBIDDEN_CONFIG_KEYS: [&str; 7] = [
    "dbms.cluster.discovery.resolver_type",
    "dbms.cluster.discovery.v2.endpoints",
    "dbms.cluster.endpoints",
    "dbms.kubernetes.label_selector",
    "dbms.kubernetes.discovery.service_port_name",
    "dbms.kubernetes.discovery.v2.service_port_name",
    "dbms.mode",
];

/// `dbms.cluster.discovery.version` is also operator-managed but is
/// validated separately since it is version-conditional.
pub const FORBIDDEN_CONFIG_KEY_DISCOVERY_VERSION: &str = "dbms.cluster.discovery.version";

/// Exact deprecated keys rejected outright.
pub const DEPRECATED_CONFIG_KEYS: [&str; 2] = ["db.format", "server.groups"];

/// Deprecated key *prefixes* rejected outright.
pub const DEPRECATED_CONFIG_PREFIXES: [&str; 3] = [
    "causal_clustering.",
    "dbms.connector.",
    "dbms.memory.",
];

fn validate_config_keys(config: &std::collections::BTreeMap<String, String>) -> Result<(), ValidationError> {
    for key in config.keys() {
        if FORBIDDEN_CONFIG_KEYS.contains(&key.as_str()) || key == FORBIDDEN_CONFIG_KEY_DISCOVERY_VERSION {
            return Err(ValidationError::ForbiddenConfigKey(key.clone()));
        }
        if DEPRECATED_CONFIG_KEYS.contains(&key.as_str())
            || DEPRECATED_CONFIG_PREFIXES.iter().any(|p| key.starts_with(p))
        {
            return Err(ValidationError::DeprecatedConfigKey(key.clone()));
        }
    }
    Ok(())
}

/// Non-blocking warnings a caller may choose to emit as Kubernetes
/// events (`TopologyWarning`, `MCPApocMissing`) without failing
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    EvenPrimaryCount,
    McpApocMissing,
}

pub struct ClusterValidation {
    pub warnings: Vec<ValidationWarning>,
}

/// Validates an `EnterpriseClusterSpec`. `plugin_names` lists the
/// `name` field of every `Neo4jPlugin` resource that references this
/// cluster, used to check the `mcp.enabled` + apoc requirement.
pub fn validate_cluster(
    spec: &EnterpriseClusterSpec,
    plugin_names: &[String],
) -> Result<ClusterValidation, ValidationError> {
    if !(2..=20).contains(&spec.topology.servers) {
        return Err(ValidationError::ServerCountOutOfRange(spec.topology.servers));
    }
    let version = Neo4jVersion::parse(&spec.image.tag)?;
    validate_config_keys(&spec.config)?;

    let mut warnings = Vec::new();
    if spec.topology.servers % 2 == 0 {
        warnings.push(ValidationWarning::EvenPrimaryCount);
    }

    if let Some(mcp) = &spec.mcp {
        if mcp.enabled {
            if !plugin_names.iter().any(|n| n == "apoc") {
                warnings.push(ValidationWarning::McpApocMissing);
            }
            match mcp.transport.as_deref() {
                Some("http") => {
                    if mcp.auth.is_some() {
                        return Err(ValidationError::HttpTransportForbidsAuth);
                    }
                }
                Some("stdio") => {
                    if mcp.auth.is_none() {
                        return Err(ValidationError::StdioTransportRequiresAuth);
                    }
                }
                _ => {}
            }
            if let Some(tls) = &mcp.tls {
                match tls.mode.as_str() {
                    "secret" if tls.secretName.is_none() => {
                        return Err(ValidationError::TlsSecretModeRequiresSecretName)
                    }
                    "cert-manager" if tls.issuerRef.is_none() => {
                        return Err(ValidationError::TlsCertManagerModeRequiresIssuer)
                    }
                    _ => {}
                }
            }
        }
    }
    let _ = version;
    Ok(ClusterValidation { warnings })
}

/// Standalone resources share the cluster feature surface minus
/// topology/clustering-only keys.
pub fn validate_standalone_config(
    config: &std::collections::BTreeMap<String, String>,
) -> Result<(), ValidationError> {
    validate_config_keys(config)?;
    if config.contains_key("dbms.cluster.discovery.resolver_type") {
        return Err(ValidationError::StandaloneRejectsClusteringConfig);
    }
    Ok(())
}

pub fn validate_database(spec: &DatabaseSpec, cluster_servers: i32) -> Result<(), ValidationError> {
    if spec.seedURI.is_some() && spec.initialData.is_some() {
        return Err(ValidationError::SeedUriAndInitialDataBothSet);
    }
    if let Some(seed) = &spec.seedURI {
        validate_source_uri(&seed.uri)?;
    }
    if let Some(topo) = &spec.topology {
        if topo.primaries + topo.secondaries > cluster_servers {
            return Err(ValidationError::DatabaseTopologyExceedsCluster(
                topo.primaries + topo.secondaries,
                cluster_servers,
            ));
        }
    }
    Ok(())
}

pub fn validate_restore(spec: &RestoreSpec, target_is_standalone: bool) -> Result<(), ValidationError> {
    const VALID_TYPES: [&str; 6] = ["backup", "storage", "s3", "gcs", "azure", "pitr"];
    if !VALID_TYPES.contains(&spec.source.r#type.as_str()) {
        return Err(ValidationError::UnsupportedRestoreSourceType(spec.source.r#type.clone()));
    }
    if spec.source.r#type == "pitr" && spec.pitr.as_ref().and_then(|p| p.baseBackup.as_ref()).is_none()
    {
        return Err(ValidationError::PitrMissingBase);
    }
    if spec.stopCluster && target_is_standalone {
        return Err(ValidationError::StopClusterInvalidForStandalone);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::cluster_types::{ClusterImage, TopologySpec};

    fn base_spec() -> EnterpriseClusterSpec {
        EnterpriseClusterSpec {
            image: ClusterImage {
                repository: "neo4j".into(),
                tag: "5.26.1-enterprise".into(),
                pullPolicy: "IfNotPresent".into(),
            },
            topology: TopologySpec {
                servers: 3,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn rejects_out_of_range_servers() {
        let mut spec = base_spec();
        spec.topology.servers = 1;
        assert_eq!(
            validate_cluster(&spec, &[]).unwrap_err(),
            ValidationError::ServerCountOutOfRange(1)
        );
    }

    #[test]
    fn rejects_forbidden_config_key() {
        let mut spec = base_spec();
        spec.config.insert("dbms.mode".into(), "CORE".into());
        assert!(validate_cluster(&spec, &[]).is_err());
    }

    #[test]
    fn rejects_deprecated_prefix() {
        let mut spec = base_spec();
        spec.config.insert("dbms.memory.heap.max_size".into(), "2g".into());
        assert!(validate_cluster(&spec, &[]).is_err());
    }

    #[test]
    fn warns_on_even_server_count() {
        let mut spec = base_spec();
        spec.topology.servers = 4;
        let result = validate_cluster(&spec, &[]).unwrap();
        assert!(result.warnings.contains(&ValidationWarning::EvenPrimaryCount));
    }

    #[test]
    fn accepts_supported_seed_uri_schemes() {
        for scheme in ["s3", "gs", "azb", "https", "http", "ftp"] {
            assert!(validate_source_uri(&format!("{scheme}://bucket/orders.backup")).is_ok());
        }
    }

    #[test]
    fn rejects_unsupported_seed_uri_scheme() {
        assert_eq!(
            validate_source_uri("file:///tmp/orders.backup").unwrap_err(),
            ValidationError::UnsupportedSourceUriScheme("file:///tmp/orders.backup".to_string())
        );
    }

    #[test]
    fn rejects_seed_uri_with_unsupported_scheme_via_validate_database() {
        use crate::apis::database_types::{DatabaseSpec, SeedSpec};
        let spec = DatabaseSpec {
            clusterRef: "prod-a".into(),
            name: "orders".into(),
            seedURI: Some(SeedSpec {
                uri: "file:///tmp/orders.backup".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_database(&spec, 3).is_err());
    }
}
