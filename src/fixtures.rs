//! Helper methods only available for tests: a mocked `kube::Client`
//! verifying the exact sequence of API calls a reconcile makes.
use crate::apis::cluster_types::{ClusterImage, EnterpriseClusterSpec, EnterpriseClusterStatus, TopologySpec};
use crate::apis::Neo4jEnterpriseCluster;
use crate::config::Config;
use crate::controller::{Context, Diagnostics};
use crate::controllers::FINALIZER;
use assert_json_diff::assert_json_include;
use http::{Request, Response};
use kube::{client::Body, Client, Resource, ResourceExt};
use std::sync::Arc;
use tokio::sync::RwLock;

impl Neo4jEnterpriseCluster {
    /// A normal test cluster: 3 servers, a CalVer image, no extras.
    pub fn test() -> Self {
        let mut c = Neo4jEnterpriseCluster::new(
            "testcluster",
            EnterpriseClusterSpec {
                image: ClusterImage {
                    repository: "neo4j".to_string(),
                    tag: "5.26.0-enterprise".to_string(),
                    pullPolicy: "IfNotPresent".to_string(),
                },
                topology: TopologySpec {
                    servers: 3,
                    placement: None,
                    availabilityZones: Vec::new(),
                    enforceDistribution: false,
                },
                ..Default::default()
            },
        );
        c.meta_mut().namespace = Some("testns".into());
        c.meta_mut().uid = Some("752d59ef-2671-4890-9feb-0097459b18c8".into());
        c
    }

    pub fn finalized(mut self) -> Self {
        self.finalizers_mut().push(FINALIZER.to_string());
        self
    }

    pub fn with_status(mut self, status: EnterpriseClusterStatus) -> Self {
        self.status = Some(status);
        self
    }
}

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;
pub struct ApiServerVerifier(ApiServerHandle);

/// Scenarios exercised against the mocked API server.
pub enum Scenario {
    /// Objects without a finalizer get one applied, then the apply loop short-circuits.
    FinalizerCreation(Neo4jEnterpriseCluster),
    /// Finalized objects with a deletion timestamp drop the finalizer without further calls.
    Cleanup(Neo4jEnterpriseCluster),
}

pub async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
    tokio::time::timeout(std::time::Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded")
}

impl ApiServerVerifier {
    pub fn run(self, scenario: Scenario) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            match scenario {
                Scenario::FinalizerCreation(cluster) => self.handle_finalizer_creation(cluster).await,
                Scenario::Cleanup(cluster) => self.handle_finalizer_removal(cluster).await,
            }
            .expect("scenario completed without errors");
        })
    }

    async fn handle_finalizer_creation(mut self, cluster: Neo4jEnterpriseCluster) -> Result<Self, kube::Error> {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), http::Method::PATCH);
        assert!(request.uri().to_string().contains(&cluster.name_any()));
        let expected_patch = serde_json::json!([
            { "op": "test", "path": "/metadata/finalizers", "value": null },
            { "op": "add", "path": "/metadata/finalizers", "value": vec![FINALIZER] }
        ]);
        let req_body = request.into_body().collect_bytes().await.unwrap();
        let runtime_patch: serde_json::Value =
            serde_json::from_slice(&req_body).expect("valid document from runtime");
        assert_json_include!(actual: runtime_patch, expected: expected_patch);

        let response = serde_json::to_vec(&cluster.finalized()).unwrap();
        send.send_response(Response::builder().body(Body::from(response)).unwrap());
        Ok(self)
    }

    async fn handle_finalizer_removal(mut self, cluster: Neo4jEnterpriseCluster) -> Result<Self, kube::Error> {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), http::Method::PATCH);
        assert!(request.uri().to_string().contains(&cluster.name_any()));
        let expected_patch = serde_json::json!([
            { "op": "test", "path": "/metadata/finalizers/0", "value": FINALIZER },
        ]);
        let req_body = request.into_body().collect_bytes().await.unwrap();
        let runtime_patch: serde_json::Value =
            serde_json::from_slice(&req_body).expect("valid document from runtime");
        assert_json_include!(actual: runtime_patch, expected: expected_patch);

        let response = serde_json::to_vec(&cluster).unwrap();
        send.send_response(Response::builder().body(Body::from(response)).unwrap());
        Ok(self)
    }
}

impl Context {
    /// Creates a test context with a mocked kube client, locally
    /// registered metrics, and default diagnostics/config.
    pub fn test() -> (Arc<Self>, ApiServerVerifier) {
        let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
        let mock_client = Client::new(mock_service, "default");
        let registry = prometheus::Registry::new();
        let ctx = Self {
            client: mock_client,
            metrics: crate::Metrics::default().register(&registry).unwrap(),
            diagnostics: Arc::new(RwLock::new(Diagnostics::default())),
            config: Config::default(),
        };
        (Arc::new(ctx), ApiServerVerifier(handle))
    }
}
