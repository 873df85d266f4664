use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::{
    cluster::{ClusterClient, KubeCluster, MemoryCluster},
    config::{AppConfig, ClusterBackend, ClusterConfig},
    monitor::MonitorRegistry,
    server::ApiServer,
    services::{InstanceCodeGenerator, ProvisionService, StatusService},
};

/// Everything `main` needs to serve and later shut down.
pub struct Components {
    pub server: ApiServer,
    pub monitors: Arc<MonitorRegistry>,
}

pub async fn build_cluster(config: &ClusterConfig) -> Result<Arc<dyn ClusterClient>> {
    match config.backend {
        ClusterBackend::Kube => {
            info!(namespace = %config.namespace, "using kubernetes cluster backend");
            let cluster =
                KubeCluster::try_default(config.namespace.clone(), config.call_timeout)
                    .await?;
            Ok(Arc::new(cluster))
        }
        ClusterBackend::Memory => {
            info!("using in-memory cluster backend");
            Ok(Arc::new(MemoryCluster::new()))
        }
    }
}

/// Wire services and the server around an existing cluster handle.
pub fn build_components(
    config: &AppConfig,
    cluster: Arc<dyn ClusterClient>,
) -> Components {
    let monitors = Arc::new(MonitorRegistry::new(
        cluster.clone(),
        config.monitor().interval,
    ));
    let provision = config.provision();
    let provision_service = Arc::new(ProvisionService::new(
        cluster.clone(),
        monitors.clone(),
        InstanceCodeGenerator::new(provision.code_max_attempts),
        provision.settings,
    ));
    let status_service = Arc::new(StatusService::new(cluster));
    Components {
        server: ApiServer::new(provision_service, status_service, config.server()),
        monitors,
    }
}
