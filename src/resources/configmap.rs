//! `neo4j.conf` ConfigMap builder. Operator-
//! managed keys are forced; version-conditional discovery keys are
//! selected from `bolt::statements::discovery_config_keys`; user
//! `spec.config` is overlaid except for forbidden/deprecated keys
//! (rejected earlier by `validation::validate_cluster`).

use crate::bolt::statements::discovery_config_keys;
use crate::version::Neo4jVersion;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::{BTreeMap, BTreeMap as Map};

pub fn configmap_name(cluster_name: &str) -> String {
    format!("{cluster_name}-conf")
}

pub fn build_neo4j_conf(
    cluster_name: &str,
    version: &Neo4jVersion,
    user_config: &Map<String, String>,
) -> String {
    let mut keys: BTreeMap<&str, String> = BTreeMap::new();
    keys.insert("dbms.cluster.discovery.resolver_type", "K8S".to_string());
    keys.insert(
        "dbms.kubernetes.label_selector",
        format!("neo4j.com/cluster={cluster_name},neo4j.com/clustering=true"),
    );
    keys.insert("server.backup.listen_address", "0.0.0.0:6362".to_string());

    let mut rendered: BTreeMap<String, String> =
        keys.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    for (k, v) in discovery_config_keys(version) {
        rendered.insert(k.to_string(), v.to_string());
    }
    for (k, v) in user_config {
        rendered.entry(k.clone()).or_insert_with(|| v.clone());
    }

    rendered.into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("\n")
}

pub fn build_configmap(
    cluster_name: &str,
    namespace: &str,
    owner: OwnerReference,
    version: &Neo4jVersion,
    user_config: &Map<String, String>,
) -> ConfigMap {
    let mut data = BTreeMap::new();
    data.insert("neo4j.conf".to_string(), build_neo4j_conf(cluster_name, version, user_config));

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(configmap_name(cluster_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(crate::resources::cluster_labels(cluster_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forces_operator_managed_keys_over_user_overrides() {
        let mut user = Map::new();
        user.insert("dbms.cluster.discovery.resolver_type".to_string(), "DNS".to_string());
        let version = Neo4jVersion::parse("5.26.1-enterprise").unwrap();
        let conf = build_neo4j_conf("prod-a", &version, &user);
        assert!(conf.contains("dbms.cluster.discovery.resolver_type=K8S"));
        assert!(!conf.contains("resolver_type=DNS"));
    }

    #[test]
    fn selects_v2_only_discovery_on_5_26() {
        let version = Neo4jVersion::parse("5.26.1-enterprise").unwrap();
        let conf = build_neo4j_conf("prod-a", &version, &Map::new());
        assert!(conf.contains("dbms.cluster.discovery.version=V2_ONLY"));
        assert!(conf.contains("dbms.kubernetes.discovery.v2.service_port_name=tcp-discovery"));
    }

    #[test]
    fn selects_default_discovery_on_calver() {
        let version = Neo4jVersion::parse("2025.04.0-enterprise").unwrap();
        let conf = build_neo4j_conf("prod-a", &version, &Map::new());
        assert!(conf.contains("dbms.kubernetes.discovery.service_port_name=tcp-discovery"));
        assert!(!conf.contains("V2_ONLY"));
    }
}
