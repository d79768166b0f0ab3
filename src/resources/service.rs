//! Three Services per cluster: headless discovery,
//! internals (client traffic within the cluster namespace), and client
//! (external/ingress-facing).

use crate::apis::cluster_types::ServiceSpec as ClusterServiceSpec;
use crate::resources::{cluster_labels, clustering_labels};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

fn ports() -> Vec<ServicePort> {
    vec![
        svc_port("bolt", 7687),
        svc_port("http", 7474),
        svc_port("https", 7473),
        svc_port("tcp-discovery", 5000),
        svc_port("tcp-tx", 6000),
        svc_port("backup", 6362),
        svc_port("metrics", 2004),
    ]
}

fn svc_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::String(name.to_string())),
        ..Default::default()
    }
}

/// Headless, `publishNotReadyAddresses=true`, selected by Neo4j's
/// Kubernetes discovery via the `clustering=true` label.
pub fn build_headless_service(cluster_name: &str, namespace: &str, owner: OwnerReference) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(format!("{cluster_name}-headless")),
            namespace: Some(namespace.to_string()),
            labels: Some(clustering_labels(cluster_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            publish_not_ready_addresses: Some(true),
            selector: Some(clustering_labels(cluster_name)),
            ports: Some(ports()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// ClusterIP, no `clustering` label, for in-namespace client traffic.
pub fn build_internals_service(cluster_name: &str, namespace: &str, owner: OwnerReference) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(format!("{cluster_name}-internals")),
            namespace: Some(namespace.to_string()),
            labels: Some(cluster_labels(cluster_name)),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(cluster_labels(cluster_name)),
            ports: Some(ports()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// External/ingress-facing; type taken from `spec.service.type`
/// (default `ClusterIP`).
pub fn build_client_service(
    cluster_name: &str,
    namespace: &str,
    owner: OwnerReference,
    spec: Option<&ClusterServiceSpec>,
) -> Service {
    let service_type = spec.map(|s| s.r#type.clone()).unwrap_or_else(crate::defaults::default_service_type);
    let annotations = spec.and_then(|s| s.annotations.clone());
    Service {
        metadata: ObjectMeta {
            name: Some(format!("{cluster_name}-client")),
            namespace: Some(namespace.to_string()),
            labels: Some(cluster_labels(cluster_name)),
            annotations,
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(service_type),
            selector: Some(cluster_labels(cluster_name)),
            ports: Some(ports()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
