use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use kube::{
    client::Client,
    runtime::events::Reporter,
};
use serde::Serialize;

use crate::config::Config;
use crate::{Error, Metrics};

/// Context for every reconciler.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client, backed by the manager's shared watch cache.
    pub client: Client,
    /// Diagnostics read by the (out-of-scope) web server.
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics.
    pub metrics: Metrics,
    /// Operator-wide tunables.
    pub config: Config,
}

pub fn requeue_normal_with_jitter(ctx: &Context) -> kube::runtime::controller::Action {
    use rand::Rng;
    let jitter = rand::thread_rng().gen_range(0..=ctx.config.reconcile_jitter_max);
    kube::runtime::controller::Action::requeue(tokio::time::Duration::from_secs(
        ctx.config.reconcile_ttl + jitter,
    ))
}

/// Shared HTTP-429 backoff policy used by every controller's
/// `error_policy`.
pub fn backoff_for(error: &Error) -> kube::runtime::controller::Action {
    use rand::Rng;
    use tokio::time::Duration;

    if let Error::KubeError(kube::Error::Api(api_error)) = error {
        if api_error.code == 429 {
            let backoff: u64 = 60;
            let jitter: u64 = rand::thread_rng().gen_range(0..=120);
            tracing::warn!("HTTP 429 from API server; backing off {}s", backoff + jitter);
            return kube::runtime::controller::Action::requeue(Duration::from_secs(backoff + jitter));
        }
    }
    kube::runtime::controller::Action::requeue(Duration::from_secs(5))
}

/// Diagnostics exposed by the (out-of-scope) web server.
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            reporter: "neo4j-operator".into(),
        }
    }
}

/// State shared between the controllers and the (out-of-scope) web
/// server.
#[derive(Clone, Default)]
pub struct State {
    diagnostics: Arc<RwLock<Diagnostics>>,
    registry: prometheus::Registry,
}

impl State {
    pub fn metrics(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    pub fn create_context(&self, client: Client) -> Arc<Context> {
        Arc::new(Context {
            client,
            metrics: Metrics::default().register(&self.registry).unwrap(),
            diagnostics: self.diagnostics.clone(),
            config: Config::default(),
        })
    }
}

/// Boots all six per-kind controllers concurrently against the shared
/// watch cache.
pub async fn run(state: State) {
    let client = match kube::Client::try_default().await {
        Ok(client) => client,
        Err(_) => panic!("Please configure your Kubernetes Context"),
    };

    let ctx = state.create_context(client.clone());

    tokio::join!(
        crate::controllers::cluster::run(client.clone(), ctx.clone()),
        crate::controllers::standalone::run(client.clone(), ctx.clone()),
        crate::controllers::database::run(client.clone(), ctx.clone()),
        crate::controllers::backup::run(client.clone(), ctx.clone()),
        crate::controllers::restore::run(client.clone(), ctx.clone()),
        crate::controllers::plugin::run(client.clone(), ctx.clone()),
    );
}

/// Helper shared by every per-kind `run()`: lists once to fail fast if
/// the CRD isn't installed.
pub async fn assert_crd_installed<K>(api: &kube::Api<K>, kind: &str)
where
    K: kube::Resource + Clone + std::fmt::Debug + for<'de> serde::Deserialize<'de>,
{
    if let Err(e) = api.list(&kube::api::ListParams::default().limit(1)).await {
        tracing::error!("{kind} CRD is not queryable; {e:?}. Is the CRD installed?");
        tracing::info!("Installation: cargo run --bin crdgen | kubectl apply -f -");
        std::process::exit(1);
    }
}
