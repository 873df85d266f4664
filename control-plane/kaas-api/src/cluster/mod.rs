//! Boundary to the cluster control plane.
//!
//! The rest of the crate only talks to [`ClusterClient`]. [`k8s::KubeCluster`]
//! drives a real API server; [`memory::MemoryCluster`] keeps everything in
//! process for local runs and tests.

pub mod k8s;
pub mod memory;

pub use k8s::KubeCluster;
pub use memory::{Fault, MemoryCluster};

use crate::templates::RenderedResource;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
    Deployment,
    Service,
    Ingress,
    CronJob,
    Job,
    Pod,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::CronJob => "CronJob",
            ResourceKind::Job => "Job",
            ResourceKind::Pod => "Pod",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),

    #[error("cluster backend error: {0}")]
    Backend(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Operations the provisioning core needs from the control plane, all scoped
/// to a single namespace. No watches and no transactions.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Look a resource up by name. A missing resource is
    /// [`ClusterError::NotFound`], never `Ok`.
    async fn lookup(&self, kind: ResourceKind, name: &str) -> ClusterResult<()>;

    /// Submit a descriptor. A name already taken is
    /// [`ClusterError::AlreadyExists`].
    async fn create(&self, resource: &RenderedResource) -> ClusterResult<()>;

    async fn get_deployment(&self, name: &str) -> ClusterResult<Deployment>;

    async fn list_deployments(&self) -> ClusterResult<Vec<Deployment>>;

    /// `selector` uses the `k=v[,k=v]` label selector syntax.
    async fn list_pods(&self, selector: Option<&str>) -> ClusterResult<Vec<Pod>>;

    async fn list_jobs(&self, selector: &str) -> ClusterResult<Vec<Job>>;

    /// Delete with background propagation; returns before pods are gone.
    async fn delete_job(&self, name: &str) -> ClusterResult<()>;

    /// Full log of a pod's (only) container.
    async fn pod_logs(&self, pod: &str) -> ClusterResult<String>;
}
