//! Topology scheduler: a pure function of cluster spec and an observed
//! node inventory. Produces the in-memory `TopologyPlacement`
//! consumed by the StatefulSet builder (`resources::statefulset`).

use crate::apis::cluster_types::{PlacementSpec, TopologySpec};
use crate::errors::TopologyError;
use k8s_openapi::api::core::v1::{
    PodAffinityTerm, PodAntiAffinity, TopologySpreadConstraint, WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use std::collections::{BTreeMap, BTreeSet};

/// Computed placement output consumed when building the StatefulSet pod
/// template.
#[derive(Debug, Clone, Default)]
pub struct TopologyPlacement {
    pub topology_spread_constraints: Vec<TopologySpreadConstraint>,
    pub pod_anti_affinity: Option<PodAntiAffinity>,
    pub node_selector: Option<BTreeMap<String, String>>,
    pub availability_zones: Vec<String>,
    pub enforce_distribution: bool,
}

/// A minimal view of an observed `Node`: just the label map, since that
/// is all the scheduler reads.
pub struct NodeView {
    pub labels: BTreeMap<String, String>,
}

fn discover_zones(explicit: &[String], nodes: &[NodeView], topology_key: &str) -> Vec<String> {
    if !explicit.is_empty() {
        let mut zones: Vec<String> = explicit.to_vec();
        zones.sort();
        zones.dedup();
        return zones;
    }
    let mut zones: BTreeSet<String> = BTreeSet::new();
    for node in nodes {
        if let Some(zone) = node.labels.get(topology_key) {
            zones.insert(zone.clone());
        }
    }
    zones.into_iter().collect()
}

/// Computes a `TopologyPlacement` for an `EnterpriseCluster` from its
/// spec and an observed node list. `pod_labels` selects the cluster's
/// own pods, used as the `labelSelector` on both the spread constraint
/// and the anti-affinity term.
pub fn compute_placement(
    topology: &TopologySpec,
    pod_labels: &BTreeMap<String, String>,
    nodes: &[NodeView],
) -> Result<TopologyPlacement, TopologyError> {
    let placement: PlacementSpec = topology.placement.clone().unwrap_or_default();
    let topology_key_default = crate::defaults::default_topology_key();
    let topology_key = placement
        .topologySpread
        .as_ref()
        .map(|t| t.topologyKey.clone())
        .or_else(|| placement.antiAffinity.as_ref().map(|a| a.topologyKey.clone()))
        .unwrap_or(topology_key_default);

    let zones = discover_zones(&topology.availabilityZones, nodes, &topology_key);

    if topology.enforceDistribution && zones.len() < topology.servers as usize {
        return Err(TopologyError::InsufficientZones {
            zones: zones.len(),
            servers: topology.servers,
        });
    }

    let selector = LabelSelector {
        match_labels: Some(pod_labels.clone()),
        ..Default::default()
    };

    let mut constraints = Vec::new();
    if let Some(spread) = &placement.topologySpread {
        if spread.enabled {
            constraints.push(TopologySpreadConstraint {
                max_skew: spread.maxSkew,
                topology_key: spread.topologyKey.clone(),
                when_unsatisfiable: spread.whenUnsatisfiable.clone(),
                label_selector: Some(selector.clone()),
                min_domains: if spread.whenUnsatisfiable == "DoNotSchedule" {
                    spread.minDomains
                } else {
                    None
                },
                ..Default::default()
            });
        }
    }

    let anti_affinity = placement.antiAffinity.as_ref().filter(|a| a.enabled).map(|a| {
        let term = PodAffinityTerm {
            topology_key: a.topologyKey.clone(),
            label_selector: Some(selector.clone()),
            ..Default::default()
        };
        if a.r#type == "required" {
            PodAntiAffinity {
                required_during_scheduling_ignored_during_execution: Some(vec![term]),
                ..Default::default()
            }
        } else {
            PodAntiAffinity {
                preferred_during_scheduling_ignored_during_execution: Some(vec![
                    WeightedPodAffinityTerm {
                        weight: 100,
                        pod_affinity_term: term,
                    },
                ]),
                ..Default::default()
            }
        }
    });

    Ok(TopologyPlacement {
        topology_spread_constraints: constraints,
        pod_anti_affinity: anti_affinity,
        node_selector: placement.nodeSelector.clone(),
        availability_zones: zones,
        enforce_distribution: topology.enforceDistribution,
    })
}

/// `(max(M) - min(M)) <= maxSkew`, used by tests and optional status
/// reporting.
pub fn is_balanced(zone_counts: &BTreeMap<String, i32>, max_skew: i32) -> bool {
    let Some(max) = zone_counts.values().max() else {
        return true;
    };
    let Some(min) = zone_counts.values().min() else {
        return true;
    };
    (max - min) <= max_skew
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::cluster_types::{AntiAffinitySpec, TopologySpreadSpec};

    fn nodes_in_zones(zones: &[&str]) -> Vec<NodeView> {
        zones
            .iter()
            .map(|z| {
                let mut labels = BTreeMap::new();
                labels.insert("topology.kubernetes.io/zone".to_string(), z.to_string());
                NodeView { labels }
            })
            .collect()
    }

    #[test]
    fn discovers_zones_from_nodes_when_unset() {
        let topo = TopologySpec {
            servers: 3,
            availabilityZones: vec![],
            enforceDistribution: false,
            placement: None,
        };
        let placement = compute_placement(&topo, &BTreeMap::new(), &nodes_in_zones(&["c", "a", "b"]))
            .unwrap();
        assert_eq!(placement.availability_zones, vec!["a", "b", "c"]);
    }

    #[test]
    fn enforce_distribution_fails_when_zones_insufficient() {
        let topo = TopologySpec {
            servers: 3,
            availabilityZones: vec![],
            enforceDistribution: true,
            placement: None,
        };
        let err = compute_placement(&topo, &BTreeMap::new(), &nodes_in_zones(&["a", "b"])).unwrap_err();
        assert_eq!(err, TopologyError::InsufficientZones { zones: 2, servers: 3 });
    }

    #[test]
    fn enforce_distribution_passes_when_zones_equal_servers() {
        let topo = TopologySpec {
            servers: 3,
            availabilityZones: vec![],
            enforceDistribution: true,
            placement: None,
        };
        assert!(compute_placement(&topo, &BTreeMap::new(), &nodes_in_zones(&["a", "b", "c"])).is_ok());
    }

    #[test]
    fn emits_spread_constraint_with_configured_max_skew() {
        let topo = TopologySpec {
            servers: 3,
            availabilityZones: vec!["a".into(), "b".into(), "c".into()],
            enforceDistribution: false,
            placement: Some(PlacementSpec {
                topologySpread: Some(TopologySpreadSpec {
                    enabled: true,
                    topologyKey: "topology.kubernetes.io/zone".into(),
                    maxSkew: 1,
                    whenUnsatisfiable: "DoNotSchedule".into(),
                    minDomains: None,
                }),
                antiAffinity: Some(AntiAffinitySpec {
                    enabled: true,
                    topologyKey: "kubernetes.io/hostname".into(),
                    r#type: "required".into(),
                }),
                nodeSelector: None,
            }),
        };
        let mut labels = BTreeMap::new();
        labels.insert("neo4j.com/cluster".to_string(), "prod-a".to_string());
        let placement = compute_placement(&topo, &labels, &[]).unwrap();
        assert_eq!(placement.topology_spread_constraints.len(), 1);
        assert_eq!(placement.topology_spread_constraints[0].max_skew, 1);
        assert!(placement.pod_anti_affinity.is_some());
    }

    #[test]
    fn balance_predicate_respects_max_skew() {
        let mut counts = BTreeMap::new();
        counts.insert("a".to_string(), 2);
        counts.insert("b".to_string(), 1);
        assert!(is_balanced(&counts, 1));
        assert!(!is_balanced(&counts, 0));
    }
}
