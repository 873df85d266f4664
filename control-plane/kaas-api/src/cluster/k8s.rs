use super::{ClusterClient, ClusterError, ClusterResult, ResourceKind};
use crate::templates::RenderedResource;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, ListParams, LogParams, PostParams};
use kube::{Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

/// [`ClusterClient`] backed by a live API server. Every call is bounded by
/// `call_timeout`.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    namespace: String,
    call_timeout: Duration,
}

impl KubeCluster {
    pub fn new(client: Client, namespace: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            call_timeout,
        }
    }

    /// Build from the ambient kubeconfig or in-cluster service account.
    pub async fn try_default(
        namespace: impl Into<String>,
        call_timeout: Duration,
    ) -> ClusterResult<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, namespace, call_timeout))
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> ClusterResult<T>
    where
        F: Future<Output = Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(res) => res.map_err(ClusterError::from),
            Err(_) => Err(ClusterError::Timeout {
                op,
                after: self.call_timeout,
            }),
        }
    }

    async fn lookup_typed<K>(&self, kind: ResourceKind, name: &str) -> ClusterResult<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api = self.api::<K>();
        match self.bounded("get", api.get_opt(name)).await? {
            Some(_) => Ok(()),
            None => Err(ClusterError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }

    async fn create_typed<K>(&self, kind: ResourceKind, obj: &K) -> ClusterResult<()>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api = self.api::<K>();
        let name = obj.meta().name.clone().unwrap_or_default();
        match self
            .bounded("create", api.create(&PostParams::default(), obj))
            .await
        {
            Ok(_) => {
                debug!(%kind, %name, "created");
                Ok(())
            }
            Err(ClusterError::Kube(kube::Error::Api(ae))) if ae.code == 409 => {
                Err(ClusterError::AlreadyExists { kind, name })
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, kind: ResourceKind, name: &str) -> ClusterResult<()> {
        match kind {
            ResourceKind::ConfigMap => self.lookup_typed::<ConfigMap>(kind, name).await,
            ResourceKind::Secret => self.lookup_typed::<Secret>(kind, name).await,
            ResourceKind::Deployment => self.lookup_typed::<Deployment>(kind, name).await,
            ResourceKind::Service => self.lookup_typed::<Service>(kind, name).await,
            ResourceKind::Ingress => self.lookup_typed::<Ingress>(kind, name).await,
            ResourceKind::CronJob => self.lookup_typed::<CronJob>(kind, name).await,
            ResourceKind::Job => self.lookup_typed::<Job>(kind, name).await,
            ResourceKind::Pod => self.lookup_typed::<Pod>(kind, name).await,
        }
    }

    #[instrument(level = "debug", skip_all, fields(kind = %resource.kind(), name = resource.name()))]
    async fn create(&self, resource: &RenderedResource) -> ClusterResult<()> {
        let kind = resource.kind();
        match resource {
            RenderedResource::ConfigMap(r) => self.create_typed(kind, r).await,
            RenderedResource::Secret(r) => self.create_typed(kind, r).await,
            RenderedResource::Deployment(r) => self.create_typed(kind, r).await,
            RenderedResource::Service(r) => self.create_typed(kind, r).await,
            RenderedResource::Ingress(r) => self.create_typed(kind, r).await,
            RenderedResource::CronJob(r) => self.create_typed(kind, r).await,
        }
    }

    async fn get_deployment(&self, name: &str) -> ClusterResult<Deployment> {
        let api = self.api::<Deployment>();
        self.bounded("get deployment", api.get_opt(name))
            .await?
            .ok_or_else(|| ClusterError::NotFound {
                kind: ResourceKind::Deployment,
                name: name.to_string(),
            })
    }

    async fn list_deployments(&self) -> ClusterResult<Vec<Deployment>> {
        let api = self.api::<Deployment>();
        let list = self
            .bounded("list deployments", api.list(&ListParams::default()))
            .await?;
        Ok(list.items)
    }

    async fn list_pods(&self, selector: Option<&str>) -> ClusterResult<Vec<Pod>> {
        let api = self.api::<Pod>();
        let lp = match selector {
            Some(s) => ListParams::default().labels(s),
            None => ListParams::default(),
        };
        let list = self.bounded("list pods", api.list(&lp)).await?;
        Ok(list.items)
    }

    async fn list_jobs(&self, selector: &str) -> ClusterResult<Vec<Job>> {
        let api = self.api::<Job>();
        let lp = ListParams::default().labels(selector);
        let list = self.bounded("list jobs", api.list(&lp)).await?;
        Ok(list.items)
    }

    async fn delete_job(&self, name: &str) -> ClusterResult<()> {
        let api = self.api::<Job>();
        match self
            .bounded("delete job", api.delete(name, &DeleteParams::background()))
            .await
        {
            Ok(_) => Ok(()),
            Err(ClusterError::Kube(kube::Error::Api(ae))) if ae.code == 404 => {
                Err(ClusterError::NotFound {
                    kind: ResourceKind::Job,
                    name: name.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn pod_logs(&self, pod: &str) -> ClusterResult<String> {
        let api = self.api::<Pod>();
        self.bounded("pod logs", api.logs(pod, &LogParams::default()))
            .await
    }
}
