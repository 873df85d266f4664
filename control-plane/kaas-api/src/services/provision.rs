use crate::cluster::{ClusterClient, ClusterError};
use crate::errors::ProvisionError;
use crate::monitor::MonitorRegistry;
use crate::services::credentials::{
    InstanceCodeGenerator, generate_password, generate_username,
};
use crate::services::existence::ensure_names_free;
use crate::templates::{
    ProbeSettings, RenderContext, RenderedResource, ResourceNames, ResourceSet,
    WorkloadSpec, external_host, managed_host,
};
use kaas_models::{
    ManagedRequest, ManagedResponse, PartitionedEnv, ProvisionRequest,
    ResourceLimits,
};
use std::sync::Arc;
use tracing::{info, instrument};

pub const MANAGED_IMAGE: &str = "postgres";
pub const MANAGED_TAG: &str = "13-alpine";
pub const MANAGED_PORT: i32 = 5432;
pub const MANAGED_CPU: &str = "500m";
pub const MANAGED_RAM: &str = "1Gi";

/// Knobs for the orchestrator that do not come from the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionSettings {
    pub ingress_suffix: String,
    pub password_length: usize,
    pub probe: ProbeSettings,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            ingress_suffix: "kaas.local".to_string(),
            password_length: 16,
            probe: ProbeSettings::default(),
        }
    }
}

/// Turns requests into created cluster resources.
///
/// Resources are created one at a time in a fixed order. A failure stops the
/// sequence and leaves whatever was already created in place.
#[derive(Clone)]
pub struct ProvisionService {
    cluster: Arc<dyn ClusterClient>,
    monitors: Arc<MonitorRegistry>,
    codes: InstanceCodeGenerator,
    settings: ProvisionSettings,
}

impl ProvisionService {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        monitors: Arc<MonitorRegistry>,
        codes: InstanceCodeGenerator,
        settings: ProvisionSettings,
    ) -> Self {
        Self {
            cluster,
            monitors,
            codes,
            settings,
        }
    }

    pub fn monitors(&self) -> &Arc<MonitorRegistry> {
        &self.monitors
    }

    /// Deploy a caller-described application. Returns the address message.
    #[instrument(skip_all, fields(app = %request.normalized_name()))]
    pub async fn deploy_unmanaged(
        &self,
        request: &ProvisionRequest,
    ) -> Result<String, ProvisionError> {
        let names = ResourceNames::new(request.normalized_name());
        ensure_names_free(self.cluster.as_ref(), &names).await?;

        let env = PartitionedEnv::partition(&request.envs);
        let workload = WorkloadSpec::new(
            &request.image_address,
            &request.image_tag,
            request.replicas,
            request.service_port,
            request.resources.clone(),
        );
        let host = request
            .domain()
            .map(str::to_string)
            .unwrap_or_else(|| names.base().to_string());

        let set = ResourceSet::render(&RenderContext {
            names: &names,
            workload: &workload,
            env: &env,
            ingress_host: request.external_access.then_some(host.as_str()),
            ingress_suffix: &self.settings.ingress_suffix,
            probe: request.monitor.then_some(&self.settings.probe),
        });
        self.submit(&names, set, ProvisionError::from_create).await?;
        let external = request
            .external_access
            .then(|| external_host(&host, &self.settings.ingress_suffix));

        info!(
            app = %names.base(),
            external = external.is_some(),
            monitored = request.monitor,
            "unmanaged deployment created"
        );
        Ok(access_message(&names, external.as_deref()))
    }

    /// Deploy a fresh postgres instance under a generated code.
    #[instrument(skip_all)]
    pub async fn deploy_managed(
        &self,
        request: &ManagedRequest,
    ) -> Result<ManagedResponse, ProvisionError> {
        let code = self.codes.generate(self.cluster.as_ref()).await?;
        let names = ResourceNames::managed(&code);

        let username = generate_username();
        let password =
            generate_password(self.settings.password_length, true, false, true)?;

        let mut env = PartitionedEnv::partition(&request.envs);
        env.secret
            .insert("POSTGRES_USER".to_string(), username.clone());
        env.secret
            .insert("POSTGRES_PASSWORD".to_string(), password.clone());
        env.secret.insert("POSTGRES_DB".to_string(), username.clone());

        let workload = WorkloadSpec::new(
            MANAGED_IMAGE,
            MANAGED_TAG,
            1,
            MANAGED_PORT,
            ResourceLimits::new(MANAGED_CPU, MANAGED_RAM),
        );
        let host = managed_host(&code);

        let set = ResourceSet::render(&RenderContext {
            names: &names,
            workload: &workload,
            env: &env,
            ingress_host: request.external_access.then_some(host.as_str()),
            ingress_suffix: &self.settings.ingress_suffix,
            probe: None,
        });
        // The code was checked free; a collision now is internal.
        self.submit(&names, set, ProvisionError::Cluster).await?;
        let external = request
            .external_access
            .then(|| external_host(&host, &self.settings.ingress_suffix));

        info!(%code, external = external.is_some(), "managed instance created");
        Ok(ManagedResponse {
            username,
            password,
            message: access_message(&names, external.as_deref()),
        })
    }

    /// Create the set in order: config map, secret, deployment, service,
    /// then the probe job, then the ingress. `on_error` decides how a
    /// rejected create is reported.
    async fn submit(
        &self,
        names: &ResourceNames,
        set: ResourceSet,
        on_error: fn(ClusterError) -> ProvisionError,
    ) -> Result<(), ProvisionError> {
        let mut ordered = vec![
            RenderedResource::ConfigMap(set.config_map),
            RenderedResource::Secret(set.secret),
            RenderedResource::Deployment(set.deployment),
            RenderedResource::Service(set.service),
        ];
        let monitored = set.cron_job.is_some();
        ordered.extend(set.cron_job.map(RenderedResource::CronJob));
        for resource in &ordered {
            self.cluster.create(resource).await.map_err(on_error)?;
        }
        if monitored {
            self.monitors.spawn(names).await;
        }
        if let Some(ingress) = set.ingress {
            self.cluster
                .create(&RenderedResource::Ingress(ingress))
                .await
                .map_err(on_error)?;
        }
        Ok(())
    }
}

fn access_message(names: &ResourceNames, external: Option<&str>) -> String {
    match external {
        Some(host) => format!("for external access domain address is {host}"),
        None => format!(
            "for internal access service name is: {}",
            names.service()
        ),
    }
}
