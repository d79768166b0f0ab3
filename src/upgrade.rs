//! Rolling upgrade orchestrator: the pure decision logic behind a
//! rolling upgrade. The async step execution (patching the StatefulSet partition,
//! waiting on pod readiness, polling Bolt for quorum) lives in
//! `controllers::cluster`, which calls into the functions here to
//! decide *what* to do next; this module owns *which* server goes next
//! and how progress is computed, so that logic is unit-testable without
//! a cluster.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradePhase {
    Pending,
    InProgress,
    Paused,
    Completed,
    Failed,
}

impl UpgradePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpgradePhase::Pending => "Pending",
            UpgradePhase::InProgress => "InProgress",
            UpgradePhase::Paused => "Paused",
            UpgradePhase::Completed => "Completed",
            UpgradePhase::Failed => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub total: i32,
    pub upgraded: i32,
    pub in_progress: i32,
    pub pending: i32,
}

/// Picks the next StatefulSet ordinal to update: the highest ordinal whose pod image differs from the target
/// AND is not the leader's ordinal; if every non-leader pod is already
/// current, the leader's ordinal is picked last.
pub fn next_target_ordinal(
    pod_images: &BTreeMap<i32, String>,
    target_image: &str,
    leader_ordinal: i32,
) -> Option<i32> {
    let mut stale_non_leader: Vec<i32> = pod_images
        .iter()
        .filter(|(ordinal, image)| image.as_str() != target_image && **ordinal != leader_ordinal)
        .map(|(ordinal, _)| *ordinal)
        .collect();
    stale_non_leader.sort_unstable();

    if let Some(&highest) = stale_non_leader.last() {
        return Some(highest);
    }

    match pod_images.get(&leader_ordinal) {
        Some(image) if image.as_str() != target_image => Some(leader_ordinal),
        _ => None,
    }
}

/// The StatefulSet partition to set so that exactly `target_ordinal`
/// (and nothing below it) gets replaced next.
pub fn partition_for(target_ordinal: i32) -> i32 {
    target_ordinal
}

pub fn compute_progress(pod_images: &BTreeMap<i32, String>, target_image: &str, total: i32) -> Progress {
    let upgraded = pod_images.values().filter(|img| img.as_str() == target_image).count() as i32;
    Progress {
        total,
        upgraded,
        in_progress: if upgraded < total { 1 } else { 0 },
        pending: (total - upgraded - if upgraded < total { 1 } else { 0 }).max(0),
    }
}

/// Whether the per-server step succeeded and the upgrade should
/// continue should move to `Completed`.
pub fn is_upgrade_complete(pod_images: &BTreeMap<i32, String>, target_image: &str, total: i32) -> bool {
    pod_images.len() as i32 == total && pod_images.values().all(|img| img.as_str() == target_image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images(pairs: &[(i32, &str)]) -> BTreeMap<i32, String> {
        pairs.iter().map(|(o, i)| (*o, i.to_string())).collect()
    }

    #[test]
    fn leader_last_walk_highest_ordinal_down() {
        // three servers, leader at 2, none yet upgraded
        let pods = images(&[(0, "old"), (1, "old"), (2, "old")]);
        assert_eq!(next_target_ordinal(&pods, "new", 2), Some(1));

        let pods = images(&[(0, "old"), (1, "new"), (2, "old")]);
        assert_eq!(next_target_ordinal(&pods, "new", 2), Some(0));

        let pods = images(&[(0, "new"), (1, "new"), (2, "old")]);
        assert_eq!(next_target_ordinal(&pods, "new", 2), Some(2));

        let pods = images(&[(0, "new"), (1, "new"), (2, "new")]);
        assert_eq!(next_target_ordinal(&pods, "new", 2), None);
    }

    #[test]
    fn partition_equals_target_ordinal() {
        assert_eq!(partition_for(1), 1);
    }

    #[test]
    fn detects_completion() {
        let pods = images(&[(0, "new"), (1, "new"), (2, "new")]);
        assert!(is_upgrade_complete(&pods, "new", 3));
        let pods = images(&[(0, "new"), (1, "new"), (2, "old")]);
        assert!(!is_upgrade_complete(&pods, "new", 3));
    }
}
