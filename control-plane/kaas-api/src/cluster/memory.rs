use super::{ClusterClient, ClusterError, ClusterResult, ResourceKind};
use crate::templates::RenderedResource;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Injected failure for a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    Lookup(ResourceKind),
    Create(ResourceKind),
    ListPods,
    ListJobs,
    Logs(String),
    DeleteJob(String),
}

#[derive(Default)]
struct MemoryState {
    resources: BTreeMap<(ResourceKind, String), RenderedResource>,
    jobs: BTreeMap<String, Job>,
    pods: BTreeMap<String, Pod>,
    logs: HashMap<String, String>,
    faults: HashSet<Fault>,
}

/// In-process [`ClusterClient`]. Creation is atomic per `(kind, name)`, like
/// the API server.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn inject(&self, fault: Fault) {
        self.state.write().await.faults.insert(fault);
    }

    pub async fn clear_faults(&self) {
        self.state.write().await.faults.clear();
    }

    /// Place a resource directly, bypassing collision checks.
    pub async fn seed(&self, resource: RenderedResource) {
        let key = (resource.kind(), resource.name().to_string());
        self.state.write().await.resources.insert(key, resource);
    }

    pub async fn get(&self, kind: ResourceKind, name: &str) -> Option<RenderedResource> {
        let state = self.state.read().await;
        state.resources.get(&(kind, name.to_string())).cloned()
    }

    /// Names of all stored resources of `kind`, sorted.
    pub async fn names(&self, kind: ResourceKind) -> Vec<String> {
        let state = self.state.read().await;
        match kind {
            ResourceKind::Job => state.jobs.keys().cloned().collect(),
            ResourceKind::Pod => state.pods.keys().cloned().collect(),
            _ => state
                .resources
                .keys()
                .filter(|(k, _)| *k == kind)
                .map(|(_, n)| n.clone())
                .collect(),
        }
    }

    pub async fn insert_job(&self, job: Job) {
        let name = job.metadata.name.clone().unwrap_or_default();
        self.state.write().await.jobs.insert(name, job);
    }

    pub async fn insert_pod(&self, pod: Pod) {
        let name = pod.metadata.name.clone().unwrap_or_default();
        self.state.write().await.pods.insert(name, pod);
    }

    pub async fn set_pod_log(&self, pod: &str, log: impl Into<String>) {
        self.state
            .write()
            .await
            .logs
            .insert(pod.to_string(), log.into());
    }
}

fn check(state: &MemoryState, fault: Fault) -> ClusterResult<()> {
    if state.faults.contains(&fault) {
        return Err(ClusterError::Backend(format!("injected fault: {fault:?}")));
    }
    Ok(())
}

/// Matches `k=v[,k=v]` selectors. Anything else never matches.
pub fn selector_matches(
    labels: Option<&BTreeMap<String, String>>,
    selector: &str,
) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels
                .and_then(|l| l.get(k.trim()))
                .is_some_and(|actual| actual == v.trim()),
            None => false,
        })
}

#[async_trait]
impl ClusterClient for MemoryCluster {
    async fn lookup(&self, kind: ResourceKind, name: &str) -> ClusterResult<()> {
        let state = self.state.read().await;
        check(&state, Fault::Lookup(kind))?;
        let found = match kind {
            ResourceKind::Job => state.jobs.contains_key(name),
            ResourceKind::Pod => state.pods.contains_key(name),
            _ => state.resources.contains_key(&(kind, name.to_string())),
        };
        if found {
            Ok(())
        } else {
            Err(ClusterError::NotFound {
                kind,
                name: name.to_string(),
            })
        }
    }

    async fn create(&self, resource: &RenderedResource) -> ClusterResult<()> {
        let kind = resource.kind();
        let name = resource.name().to_string();
        let mut state = self.state.write().await;
        check(&state, Fault::Create(kind))?;
        let key = (kind, name.clone());
        if state.resources.contains_key(&key) {
            return Err(ClusterError::AlreadyExists { kind, name });
        }
        state.resources.insert(key, resource.clone());
        Ok(())
    }

    async fn get_deployment(&self, name: &str) -> ClusterResult<Deployment> {
        let state = self.state.read().await;
        check(&state, Fault::Lookup(ResourceKind::Deployment))?;
        match state
            .resources
            .get(&(ResourceKind::Deployment, name.to_string()))
        {
            Some(RenderedResource::Deployment(d)) => Ok(d.clone()),
            _ => Err(ClusterError::NotFound {
                kind: ResourceKind::Deployment,
                name: name.to_string(),
            }),
        }
    }

    async fn list_deployments(&self) -> ClusterResult<Vec<Deployment>> {
        let state = self.state.read().await;
        Ok(state
            .resources
            .values()
            .filter_map(|r| match r {
                RenderedResource::Deployment(d) => Some(d.clone()),
                _ => None,
            })
            .collect())
    }

    async fn list_pods(&self, selector: Option<&str>) -> ClusterResult<Vec<Pod>> {
        let state = self.state.read().await;
        check(&state, Fault::ListPods)?;
        Ok(state
            .pods
            .values()
            .filter(|p| {
                selector.is_none_or(|s| selector_matches(p.metadata.labels.as_ref(), s))
            })
            .cloned()
            .collect())
    }

    async fn list_jobs(&self, selector: &str) -> ClusterResult<Vec<Job>> {
        let state = self.state.read().await;
        check(&state, Fault::ListJobs)?;
        Ok(state
            .jobs
            .values()
            .filter(|j| selector_matches(j.metadata.labels.as_ref(), selector))
            .cloned()
            .collect())
    }

    async fn delete_job(&self, name: &str) -> ClusterResult<()> {
        let mut state = self.state.write().await;
        check(&state, Fault::DeleteJob(name.to_string()))?;
        if state.jobs.remove(name).is_none() {
            return Err(ClusterError::NotFound {
                kind: ResourceKind::Job,
                name: name.to_string(),
            });
        }
        // background propagation: the job's pods follow it
        state.pods.retain(|_, p| {
            !selector_matches(
                p.metadata.labels.as_ref(),
                &format!("{}={name}", crate::templates::JOB_NAME_LABEL),
            )
        });
        Ok(())
    }

    async fn pod_logs(&self, pod: &str) -> ClusterResult<String> {
        let state = self.state.read().await;
        check(&state, Fault::Logs(pod.to_string()))?;
        if !state.pods.contains_key(pod) {
            return Err(ClusterError::NotFound {
                kind: ResourceKind::Pod,
                name: pod.to_string(),
            });
        }
        Ok(state.logs.get(pod).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{ResourceNames, render_service};

    #[tokio::test]
    async fn create_is_unique_per_kind_and_name() {
        let cluster = MemoryCluster::new();
        let svc = RenderedResource::Service(render_service(&ResourceNames::new("a"), 80));
        cluster.create(&svc).await.unwrap();
        let err = cluster.create(&svc).await.unwrap_err();
        assert!(matches!(err, ClusterError::AlreadyExists { kind: ResourceKind::Service, .. }));
        cluster.lookup(ResourceKind::Service, "a-service").await.unwrap();
        assert!(
            cluster
                .lookup(ResourceKind::Secret, "a-service")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn injected_faults_surface_as_backend_errors() {
        let cluster = MemoryCluster::new();
        cluster.inject(Fault::Lookup(ResourceKind::Secret)).await;
        let err = cluster.lookup(ResourceKind::Secret, "x").await.unwrap_err();
        assert!(matches!(err, ClusterError::Backend(_)));
        cluster.clear_faults().await;
        assert!(cluster.lookup(ResourceKind::Secret, "x").await.unwrap_err().is_not_found());
    }

    #[test]
    fn selector_matching() {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "demo".to_string());
        labels.insert("tier".to_string(), "web".to_string());
        assert!(selector_matches(Some(&labels), "app=demo"));
        assert!(selector_matches(Some(&labels), "app=demo, tier=web"));
        assert!(!selector_matches(Some(&labels), "app=other"));
        assert!(!selector_matches(None, "app=demo"));
        assert!(!selector_matches(Some(&labels), "app"));
    }
}
