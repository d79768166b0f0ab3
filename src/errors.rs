use thiserror::Error;

/// Validation failures surfaced on `status.conditions` with
/// `reason=ValidationFailed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("topology.servers must be in [2, 20], got {0}")]
    ServerCountOutOfRange(i32),
    #[error("image.tag {0:?} does not parse as a supported Neo4j version")]
    UnsupportedImageTag(String),
    #[error("config key {0:?} is operator-managed and cannot be set by the user")]
    ForbiddenConfigKey(String),
    #[error("config key {0:?} is deprecated and no longer accepted")]
    DeprecatedConfigKey(String),
    #[error("mcp.transport=http forbids auth")]
    HttpTransportForbidsAuth,
    #[error("mcp.transport=stdio requires auth.secretName, auth.usernameKey, auth.passwordKey")]
    StdioTransportRequiresAuth,
    #[error("tls mode=secret requires secretName")]
    TlsSecretModeRequiresSecretName,
    #[error("tls mode=cert-manager requires issuerRef.name")]
    TlsCertManagerModeRequiresIssuer,
    #[error("standalone resources cannot set clustering-only configuration")]
    StandaloneRejectsClusteringConfig,
    #[error("seedURI and initialData are mutually exclusive")]
    SeedUriAndInitialDataBothSet,
    #[error(
        "database topology.primaries + topology.secondaries ({0}) exceeds cluster topology.servers ({1})"
    )]
    DatabaseTopologyExceedsCluster(i32, i32),
    #[error("defaultCypherLanguage requires a CalVer (>= 2025) target image")]
    CypherLanguageRequiresCalVer,
    #[error("referenced secret {0:?} does not exist")]
    MissingReferencedSecret(String),
    #[error("source.type must be one of backup, storage, s3, gcs, azure, pitr, got {0:?}")]
    UnsupportedRestoreSourceType(String),
    #[error("source.type=pitr requires pitr.baseBackup or pointInTime with a valid base source")]
    PitrMissingBase,
    #[error("stopCluster=true is only valid against a Cluster, not a Standalone")]
    StopClusterInvalidForStandalone,
    #[error("backup storage.type {0:?} does not match the configured pvc/cloud block")]
    BackupStorageMismatch(String),
    #[error("scheduled backup schedule {0:?} is not a valid cron expression: {1}")]
    InvalidCronSchedule(String, String),
    #[error("target.clusterRef is required when target.kind=Database")]
    BackupTargetClusterRefRequired,
    #[error("source URI {0:?} must use one of s3, gs, azb, https, http, ftp")]
    UnsupportedSourceUriScheme(String),
}

/// Topology scheduler failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error(
        "insufficient availability zones: have {zones}, need {servers} (enforceDistribution=true)"
    )]
    InsufficientZones { zones: usize, servers: i32 },
}

/// Rolling upgrade orchestrator failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpgradeError {
    #[error("unsupported upgrade path from {from} to {to}")]
    UnsupportedUpgradePath { from: String, to: String },
    #[error("upgrade step timed out waiting for pod {ordinal} to become healthy")]
    HealthCheckTimeout { ordinal: i32 },
    #[error("upgrade step timed out waiting for cluster quorum to stabilize")]
    StabilizationTimeout,
    #[error("upgrade exceeded its total time budget of {0}s")]
    UpgradeTimeout(u64),
    #[error("timed out waiting for a new leader to be elected")]
    LeaderElectionTimeout,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kube Error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Finalizer Error: {0}")]
    // boxed because finalizer::Error embeds the reconciler error (this type), breaking the cycle
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<Error>>),

    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_json::Error),

    #[error("YamlSerializationError: {0}")]
    YamlSerializationError(#[source] serde_yaml::Error),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Topology error: {0}")]
    TopologyError(#[from] TopologyError),

    #[error("Upgrade error: {0}")]
    UpgradeError(#[from] UpgradeError),

    #[error("Bolt error: {0}")]
    BoltError(#[from] crate::bolt::BoltError),

    #[error("Missing referenced resource: {0}")]
    MissingReference(String),

    #[error("Invalid data: {0}")]
    InvalidErr(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn metric_label(&self) -> String {
        format!("{self:?}").to_lowercase()
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::YamlSerializationError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err)
    }
}
