//! `EnterpriseStandalone` reconciler: same
//! resource set as `cluster`, minus topology placement and minus the
//! rolling-upgrade walk (a standalone upgrades by a single pod
//! recreation). Reuses `resources::*` builders with `topology.servers`
//! pinned to 1 and no placement.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::{controller::Action, finalizer, watcher, Controller};
use kube::{client::Client, Resource, ResourceExt};
use tracing::{instrument, warn};

use crate::apis::cluster_types::TopologySpec;
use crate::apis::standalone_types::EnterpriseStandaloneStatus;
use crate::apis::{Condition, Neo4jEnterpriseStandalone};
use crate::controller::{backoff_for, requeue_normal_with_jitter, Context};
use crate::controllers::{owner_reference, FINALIZER};
use crate::errors::Error;
use crate::resources::{configmap, rbac, secret, service, statefulset};
use crate::telemetry;
use crate::topology::TopologyPlacement;
use crate::validation::validate_standalone_config;
use crate::version::Neo4jVersion;

type Result<T> = crate::errors::Result<T>;

pub async fn run(client: Client, ctx: Arc<Context>) {
    let standalones = Api::<Neo4jEnterpriseStandalone>::all(client);
    crate::controller::assert_crd_installed(&standalones, "Neo4jEnterpriseStandalone").await;

    Controller::new(standalones, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .filter_map(|x| async move { x.ok() })
        .for_each(|_| futures::future::ready(()))
        .await;
}

fn error_policy(obj: Arc<Neo4jEnterpriseStandalone>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(standalone = %obj.name_any(), %error, "standalone reconcile failed");
    ctx.metrics.set_failure(obj.as_ref(), error);
    backoff_for(error)
}

#[instrument(skip(ctx, obj), fields(name = %obj.name_any()))]
async fn reconcile(obj: Arc<Neo4jEnterpriseStandalone>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    let _timer = ctx.metrics.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = chrono::Utc::now();

    let ns = obj.namespace().unwrap_or_default();
    let api: Api<Neo4jEnterpriseStandalone> = Api::namespaced(ctx.client.clone(), &ns);

    finalizer::finalizer(&api, FINALIZER, obj, |event| async {
        match event {
            finalizer::Event::Apply(o) => apply(o, ctx.clone()).await,
            finalizer::Event::Cleanup(_) => Ok(Action::await_change()),
        }
    })
    .await
    .map_err(|e| Error::FinalizerError(Box::new(e)))
}

async fn apply(obj: Arc<Neo4jEnterpriseStandalone>, ctx: Arc<Context>) -> Result<Action> {
    let name = obj.name_any();
    let ns = obj.namespace().unwrap_or_default();
    let spec = &obj.spec;
    let owner = owner_reference(obj.as_ref());
    let pp = PatchParams::apply(crate::resources::PATCH_MANAGER).force();

    validate_standalone_config(&spec.config)?;
    let version = Neo4jVersion::parse(&spec.image.tag)?;

    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &ns);
    let admin_secret_name = spec
        .auth
        .as_ref()
        .and_then(|a| a.adminSecret.clone())
        .unwrap_or_else(|| secret::admin_secret_name(&name));
    let existing_password = secrets
        .get_opt(&admin_secret_name)
        .await?
        .and_then(|s| s.data)
        .and_then(|d| d.get("password").map(|p| String::from_utf8_lossy(&p.0).to_string()));
    if spec.auth.as_ref().and_then(|a| a.adminSecret.clone()).is_none() {
        secrets
            .patch(
                &admin_secret_name,
                &pp,
                &Patch::Apply(&secret::build_admin_secret(&name, &ns, owner.clone(), existing_password)),
            )
            .await?;
    }

    let sa_name = rbac::service_account_name(&name);
    let sa_api: Api<k8s_openapi::api::core::v1::ServiceAccount> = Api::namespaced(ctx.client.clone(), &ns);
    sa_api
        .patch(&sa_name, &pp, &Patch::Apply(&rbac::build_service_account(&name, &ns, owner.clone())))
        .await?;

    let svc_api: Api<k8s_openapi::api::core::v1::Service> = Api::namespaced(ctx.client.clone(), &ns);
    svc_api
        .patch(
            &format!("{name}-client"),
            &pp,
            &Patch::Apply(&service::build_client_service(&name, &ns, owner.clone(), spec.service.as_ref())),
        )
        .await?;

    let cm_api: Api<k8s_openapi::api::core::v1::ConfigMap> = Api::namespaced(ctx.client.clone(), &ns);
    let cm_name = configmap::configmap_name(&name);
    cm_api
        .patch(
            &cm_name,
            &pp,
            &Patch::Apply(&configmap::build_configmap(&name, &ns, owner.clone(), &version, &spec.config)),
        )
        .await?;

    // Single-replica server StatefulSet: the cluster builder is reused
    // with `topology.servers = 1` and no placement.
    let cluster_spec = crate::apis::cluster_types::EnterpriseClusterSpec {
        image: spec.image.clone(),
        topology: TopologySpec {
            servers: 1,
            placement: None,
            availabilityZones: Vec::new(),
            enforceDistribution: false,
        },
        storage: spec.storage.clone(),
        tls: spec.tls.clone(),
        auth: spec.auth.clone(),
        service: spec.service.clone(),
        config: spec.config.clone(),
        mcp: spec.mcp.clone(),
        propertySharding: spec.propertySharding.clone(),
        auraFleetManagement: spec.auraFleetManagement.clone(),
        upgradeStrategy: Default::default(),
        queryMonitoring: spec.queryMonitoring.clone(),
        autoScaling: None,
    };
    let placement = TopologyPlacement::default();
    let statefulsets: Api<StatefulSet> = Api::namespaced(ctx.client.clone(), &ns);
    let desired_sts = statefulset::build_statefulset(
        &name,
        &ns,
        owner.clone(),
        &cluster_spec,
        &placement,
        &cm_name,
        &admin_secret_name,
        Vec::new(),
        0,
    );
    statefulsets
        .patch(&statefulset::statefulset_name(&name), &pp, &Patch::Apply(&desired_sts))
        .await?;

    let sts = statefulsets.get_opt(&statefulset::statefulset_name(&name)).await?;
    let ready = sts.and_then(|s| s.status).and_then(|s| s.ready_replicas).unwrap_or(0) >= 1;

    let mut endpoints = BTreeMap::new();
    endpoints.insert("bolt".to_string(), format!("bolt://{name}-client.{ns}.svc:7687"));

    let status = EnterpriseStandaloneStatus {
        phase: if ready { "Ready" } else { "Initializing" }.to_string(),
        conditions: vec![Condition {
            type_: "Ready".to_string(),
            status: if ready { "True" } else { "False" }.to_string(),
            reason: if ready { "Ready" } else { "Initializing" }.to_string(),
            message: String::new(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        }],
        ready,
        endpoints: Some(endpoints),
        version: Some(version.to_string()),
        upgradeStatus: None,
        observedGeneration: obj.meta().generation,
    };

    let api: Api<Neo4jEnterpriseStandalone> = Api::namespaced(ctx.client.clone(), &ns);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch)).await?;

    Ok(requeue_normal_with_jitter(&ctx))
}
