//! Neo4j image tag parsing and the SemVer/CalVer union order used by the
//! rolling upgrade orchestrator and by version-gated
//! Cypher statements and config keys.

use crate::errors::{UpgradeError, ValidationError};
use semver::Version;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neo4jVersion {
    /// MAJOR.MINOR.PATCH, accepted only for MAJOR=5, MINOR>=26.
    SemVer { major: u64, minor: u64, patch: u64 },
    /// YYYY.MM.PATCH, accepted only for YYYY>=2025.
    CalVer { year: u64, month: u64, patch: u64 },
}

impl Neo4jVersion {
    /// Parses an image tag such as `5.26.1-enterprise` or
    /// `2025.04.0-enterprise`. The numeric dotted triple is taken up to
    /// the first `-`; anything after it (edition suffix) is ignored.
    pub fn parse(tag: &str) -> Result<Self, ValidationError> {
        let numeric = tag.split('-').next().unwrap_or(tag);
        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.len() != 3 {
            return Err(ValidationError::UnsupportedImageTag(tag.to_string()));
        }
        // Re-join without leading zeros (e.g. CalVer "2025.04.0") since
        // semver's grammar forbids them.
        let nums: Result<Vec<u64>, _> = parts.iter().map(|p| p.parse::<u64>()).collect();
        let nums = nums.map_err(|_| ValidationError::UnsupportedImageTag(tag.to_string()))?;
        let normalized = format!("{}.{}.{}", nums[0], nums[1], nums[2]);
        let version =
            Version::parse(&normalized).map_err(|_| ValidationError::UnsupportedImageTag(tag.to_string()))?;
        let (a, b, c) = (version.major, version.minor, version.patch);

        if a == 5 && b >= 26 {
            return Ok(Neo4jVersion::SemVer {
                major: a,
                minor: b,
                patch: c,
            });
        }
        if a >= 2025 && (1..=12).contains(&b) {
            return Ok(Neo4jVersion::CalVer {
                year: a,
                month: b,
                patch: c,
            });
        }
        Err(ValidationError::UnsupportedImageTag(tag.to_string()))
    }

    pub fn is_calver(&self) -> bool {
        matches!(self, Neo4jVersion::CalVer { .. })
    }

    /// True for CalVer releases at or after 2025.04, the cutoff at which
    /// `preferDiffAsParent` starts being honored.
    pub fn is_calver_at_least_2025_04(&self) -> bool {
        matches!(self, Neo4jVersion::CalVer { year, month, .. } if (*year, *month) >= (2025, 4))
    }

    fn rank(&self) -> (u8, u64, u64, u64) {
        match self {
            Neo4jVersion::SemVer { major, minor, patch } => (0, *major, *minor, *patch),
            Neo4jVersion::CalVer { year, month, patch } => (1, *year, *month, *patch),
        }
    }
}

impl PartialOrd for Neo4jVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.rank().cmp(&other.rank()))
    }
}

impl Ord for Neo4jVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl std::fmt::Display for Neo4jVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Neo4jVersion::SemVer { major, minor, patch } => write!(f, "{major}.{minor}.{patch}"),
            Neo4jVersion::CalVer { year, month, patch } => write!(f, "{year}.{month:02}.{patch}"),
        }
    }
}

/// Upgrade version policy: accept only `target > current` under the
/// union order above; SemVer->CalVer is allowed (CalVer always ranks
/// above SemVer in `rank()`), CalVer->SemVer and downgrades are rejected.
pub fn upgrade_allowed(current: &Neo4jVersion, target: &Neo4jVersion) -> Result<(), UpgradeError> {
    let unsupported = || UpgradeError::UnsupportedUpgradePath {
        from: current.to_string(),
        to: target.to_string(),
    };
    if matches!(current, Neo4jVersion::CalVer { .. }) && matches!(target, Neo4jVersion::SemVer { .. })
    {
        return Err(unsupported());
    }
    if target > current {
        Ok(())
    } else {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_semver_enterprise_tag() {
        let v = Neo4jVersion::parse("5.26.1-enterprise").unwrap();
        assert_eq!(v, Neo4jVersion::SemVer { major: 5, minor: 26, patch: 1 });
    }

    #[test]
    fn parses_calver_tag() {
        let v = Neo4jVersion::parse("2025.04.0-enterprise").unwrap();
        assert_eq!(v, Neo4jVersion::CalVer { year: 2025, month: 4, patch: 0 });
    }

    #[test]
    fn rejects_semver_below_5_26() {
        assert!(Neo4jVersion::parse("5.25.0-enterprise").is_err());
    }

    #[test]
    fn rejects_calver_before_2025() {
        assert!(Neo4jVersion::parse("2024.12.0-enterprise").is_err());
    }

    #[test]
    fn allows_minor_bump() {
        let cur = Neo4jVersion::parse("5.26.1-enterprise").unwrap();
        let tgt = Neo4jVersion::parse("5.26.2-enterprise").unwrap();
        assert!(upgrade_allowed(&cur, &tgt).is_ok());
    }

    #[test]
    fn rejects_downgrade() {
        let cur = Neo4jVersion::parse("5.26.2-enterprise").unwrap();
        let tgt = Neo4jVersion::parse("5.26.1-enterprise").unwrap();
        assert!(upgrade_allowed(&cur, &tgt).is_err());
    }

    #[test]
    fn rejects_calver_to_semver() {
        let cur = Neo4jVersion::parse("2025.04.0-enterprise").unwrap();
        let tgt = Neo4jVersion::parse("5.26.9-enterprise").unwrap();
        assert!(upgrade_allowed(&cur, &tgt).is_err());
    }

    #[test]
    fn allows_semver_to_calver() {
        let cur = Neo4jVersion::parse("5.26.9-enterprise").unwrap();
        let tgt = Neo4jVersion::parse("2025.01.0-enterprise").unwrap();
        assert!(upgrade_allowed(&cur, &tgt).is_ok());
    }

    #[test]
    fn rejects_same_version() {
        let cur = Neo4jVersion::parse("5.26.1-enterprise").unwrap();
        assert!(upgrade_allowed(&cur, &cur).is_err());
    }
}
