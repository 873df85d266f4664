use crate::cluster::{ClusterClient, ClusterError};
use crate::errors::ProvisionError;
use crate::templates::{APP_LABEL, ResourceNames, app_from_deployment_name};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kaas_models::{DeploymentStatus, PodStatus};
use std::sync::Arc;
use tracing::instrument;

/// Read-only view over workloads and their pods.
#[derive(Clone)]
pub struct StatusService {
    cluster: Arc<dyn ClusterClient>,
}

impl StatusService {
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    #[instrument(skip(self))]
    pub async fn get_status(
        &self,
        app: &str,
    ) -> Result<DeploymentStatus, ProvisionError> {
        let app = app.trim().to_lowercase();
        let names = ResourceNames::new(app.clone());
        let deployment = match self.cluster.get_deployment(&names.deployment()).await {
            Ok(d) => d,
            Err(ClusterError::NotFound { .. }) => {
                return Err(ProvisionError::NotFound(app));
            }
            Err(e) => return Err(e.into()),
        };
        let selector = format!("{APP_LABEL}={}", names.label());
        let pods = self.cluster.list_pods(Some(&selector)).await?;
        Ok(project(&deployment, pods.iter()))
    }

    /// Every workload in the namespace. Pods are matched to a workload by
    /// their `app` label.
    #[instrument(skip(self))]
    pub async fn get_all_statuses(
        &self,
    ) -> Result<Vec<DeploymentStatus>, ProvisionError> {
        let deployments = self.cluster.list_deployments().await?;
        let pods = self.cluster.list_pods(None).await?;
        Ok(deployments
            .iter()
            .map(|d| {
                let app = d
                    .metadata
                    .name
                    .as_deref()
                    .and_then(app_from_deployment_name);
                let owned = pods
                    .iter()
                    .filter(|p| app.is_some() && pod_app(p) == app);
                project(d, owned)
            })
            .collect())
    }
}

fn pod_app(pod: &Pod) -> Option<&str> {
    pod.metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(APP_LABEL))
        .map(String::as_str)
}

fn project<'a>(
    deployment: &Deployment,
    pods: impl Iterator<Item = &'a Pod>,
) -> DeploymentStatus {
    let replicas = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or_default();
    let ready_replicas = deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or_default();
    DeploymentStatus {
        deployment_name: deployment.metadata.name.clone().unwrap_or_default(),
        replicas,
        ready_replicas,
        pod_statuses: pods.map(pod_status).collect(),
    }
}

fn pod_status(pod: &Pod) -> PodStatus {
    let status = pod.status.as_ref();
    PodStatus {
        name: pod.metadata.name.clone().unwrap_or_default(),
        phase: status.and_then(|s| s.phase.clone()).unwrap_or_default(),
        host_ip: status.and_then(|s| s.host_ip.clone()).unwrap_or_default(),
        pod_ip: status.and_then(|s| s.pod_ip.clone()).unwrap_or_default(),
        // RFC 3339 via the type's own serializer
        start_time: status
            .and_then(|s| s.start_time.as_ref())
            .and_then(|t| serde_json::to_value(t).ok())
            .and_then(|v| v.as_str().map(str::to_string)),
    }
}
