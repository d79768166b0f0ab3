//! The server StatefulSet builder: builds a desired
//! child object as a pure function of the parent spec plus the
//! topology scheduler's output.

use crate::apis::cluster_types::EnterpriseClusterSpec;
use crate::resources::{cluster_labels, clustering_labels};
use crate::topology::TopologyPlacement;
use k8s_openapi::api::apps::v1::{
    StatefulSet, StatefulSetPersistentVolumeClaimRetentionPolicy, StatefulSetSpec,
    StatefulSetUpdateStrategy,
};
use k8s_openapi::api::core::v1::{
    Affinity, Capabilities, Container, EnvFromSource, EnvVar, ConfigMapEnvSource, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, Probe, ResourceRequirements, SecurityContext, TCPSocketAction,
    Toleration, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

pub const SERVER_SUFFIX: &str = "server";
pub const DATA_VOLUME: &str = "data";
pub const NEO4J_UID: i64 = 7474;

pub fn statefulset_name(cluster_name: &str) -> String {
    format!("{cluster_name}-{SERVER_SUFFIX}")
}

/// Builds the desired server StatefulSet for an `EnterpriseCluster`.
/// `partition` carries the rolling-upgrade orchestrator's current
/// partition ordinal; pass `0` outside an upgrade.
#[allow(clippy::too_many_arguments)]
pub fn build_statefulset(
    cluster_name: &str,
    namespace: &str,
    owner: OwnerReference,
    spec: &EnterpriseClusterSpec,
    placement: &TopologyPlacement,
    configmap_name: &str,
    admin_secret_name: &str,
    plugin_env: Vec<EnvVar>,
    partition: i32,
) -> StatefulSet {
    let name = statefulset_name(cluster_name);
    let labels = cluster_labels(cluster_name);
    let pod_labels = clustering_labels(cluster_name);

    let mut env = vec![
        EnvVar {
            name: "NEO4J_ACCEPT_LICENSE_AGREEMENT".to_string(),
            value: Some("yes".to_string()),
            ..Default::default()
        },
        EnvVar {
            name: "NEO4J_AUTH".to_string(),
            value_from: Some(k8s_openapi::api::core::v1::EnvVarSource {
                secret_key_ref: Some(k8s_openapi::api::core::v1::SecretKeySelector {
                    name: Some(admin_secret_name.to_string()),
                    key: "NEO4J_AUTH".to_string(),
                    optional: Some(false),
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
    ];
    env.extend(plugin_env);

    let node_selector = placement.node_selector.clone();

    let affinity = placement.pod_anti_affinity.clone().map(|anti| Affinity {
        pod_anti_affinity: Some(anti),
        ..Default::default()
    });

    let container = Container {
        name: "neo4j".to_string(),
        image: Some(format!("{}:{}", spec.image.repository, spec.image.tag)),
        image_pull_policy: Some(spec.image.pullPolicy.clone()),
        env: Some(env),
        env_from: Some(vec![EnvFromSource {
            config_map_ref: Some(ConfigMapEnvSource {
                name: Some(configmap_name.to_string()),
                optional: Some(false),
            }),
            ..Default::default()
        }]),
        ports: Some(vec![
            port("bolt", 7687),
            port("http", 7474),
            port("https", 7473),
            port("backup", 6362),
            port("discovery", 5000),
            port("tx", 6000),
            port("metrics", 2004),
        ]),
        volume_mounts: Some(vec![
            VolumeMount {
                name: DATA_VOLUME.to_string(),
                mount_path: "/data".to_string(),
                ..Default::default()
            },
            VolumeMount {
                name: "logs".to_string(),
                mount_path: "/logs".to_string(),
                ..Default::default()
            },
            VolumeMount {
                name: "conf".to_string(),
                mount_path: "/conf".to_string(),
                ..Default::default()
            },
            VolumeMount {
                name: "ssl".to_string(),
                mount_path: "/ssl".to_string(),
                ..Default::default()
            },
        ]),
        resources: Some(ResourceRequirements::default()),
        liveness_probe: Some(Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::Int(7687),
                ..Default::default()
            }),
            initial_delay_seconds: Some(60),
            period_seconds: Some(20),
            ..Default::default()
        }),
        readiness_probe: Some(Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::Int(7687),
                ..Default::default()
            }),
            initial_delay_seconds: Some(30),
            period_seconds: Some(10),
            ..Default::default()
        }),
        security_context: Some(SecurityContext {
            run_as_non_root: Some(true),
            run_as_user: Some(NEO4J_UID),
            allow_privilege_escalation: Some(false),
            capabilities: Some(Capabilities {
                drop: Some(vec!["ALL".to_string()]),
                ..Default::default()
            }),
            seccomp_profile: Some(k8s_openapi::api::core::v1::SeccompProfile {
                type_: "RuntimeDefault".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    let tolerations: Vec<Toleration> = Vec::new();

    StatefulSet {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(StatefulSetSpec {
            replicas: Some(spec.topology.servers),
            service_name: format!("{cluster_name}-headless"),
            // critical: TLS cluster formation requires simultaneous pod startup.
            pod_management_policy: Some("Parallel".to_string()),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            update_strategy: Some(StatefulSetUpdateStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(k8s_openapi::api::apps::v1::RollingUpdateStatefulSetStrategy {
                    partition: Some(partition),
                    ..Default::default()
                }),
            }),
            persistent_volume_claim_retention_policy: Some(
                StatefulSetPersistentVolumeClaimRetentionPolicy {
                    when_deleted: Some(spec.storage.retentionPolicy.clone()),
                    when_scaled: Some("Retain".to_string()),
                },
            ),
            volume_claim_templates: Some(vec![PersistentVolumeClaim {
                metadata: ObjectMeta {
                    name: Some(DATA_VOLUME.to_string()),
                    ..Default::default()
                },
                spec: Some(PersistentVolumeClaimSpec {
                    access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                    storage_class_name: spec.storage.storageClassName.clone(),
                    resources: Some(k8s_openapi::api::core::v1::ResourceRequirements {
                        requests: Some(BTreeMap::from([(
                            "storage".to_string(),
                            spec.storage.size.clone(),
                        )])),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            template: k8s_openapi::api::core::v1::PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(pod_labels),
                    ..Default::default()
                }),
                spec: Some(k8s_openapi::api::core::v1::PodSpec {
                    containers: vec![container],
                    volumes: Some(vec![
                        Volume {
                            name: "logs".to_string(),
                            empty_dir: Some(Default::default()),
                            ..Default::default()
                        },
                        Volume {
                            name: "conf".to_string(),
                            empty_dir: Some(Default::default()),
                            ..Default::default()
                        },
                        Volume {
                            name: "ssl".to_string(),
                            empty_dir: Some(Default::default()),
                            ..Default::default()
                        },
                    ]),
                    affinity,
                    topology_spread_constraints: if placement.topology_spread_constraints.is_empty() {
                        None
                    } else {
                        Some(placement.topology_spread_constraints.clone())
                    },
                    node_selector,
                    tolerations: if tolerations.is_empty() { None } else { Some(tolerations) },
                    security_context: Some(k8s_openapi::api::core::v1::PodSecurityContext {
                        run_as_non_root: Some(true),
                        run_as_user: Some(NEO4J_UID),
                        fs_group: Some(NEO4J_UID),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn port(name: &str, port: i32) -> k8s_openapi::api::core::v1::ContainerPort {
    k8s_openapi::api::core::v1::ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        ..Default::default()
    }
}
