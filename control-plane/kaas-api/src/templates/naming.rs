use crate::cluster::ResourceKind;

/// Pod selector label shared by a workload, its pods and its service.
pub const APP_LABEL: &str = "app";
/// Label put on health-check jobs so the reaper can find the ones it owns.
pub const MONITOR_LABEL: &str = "kaas.local/monitor";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY: &str = "kaas";
/// Label Kubernetes puts on pods spawned by a Job.
pub const JOB_NAME_LABEL: &str = "job-name";

pub const MANAGED_PREFIX: &str = "postgres";

/// Canonical names of every resource derived from one base name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceNames {
    base: String,
}

impl ResourceNames {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Names for a managed instance: `postgres-{code}`.
    pub fn managed(code: &str) -> Self {
        Self::new(format!("{MANAGED_PREFIX}-{code}"))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Value of the `app` label on the workload, its pods and its service.
    pub fn label(&self) -> &str {
        &self.base
    }

    pub fn config(&self) -> String {
        self.suffixed("config")
    }

    pub fn secret(&self) -> String {
        self.suffixed("secret")
    }

    pub fn deployment(&self) -> String {
        self.suffixed("deployment")
    }

    pub fn service(&self) -> String {
        self.suffixed("service")
    }

    pub fn ingress(&self) -> String {
        self.suffixed("ingress")
    }

    pub fn cron_job(&self) -> String {
        self.suffixed("cronjob")
    }

    pub fn for_kind(&self, kind: ResourceKind) -> String {
        match kind {
            ResourceKind::ConfigMap => self.config(),
            ResourceKind::Secret => self.secret(),
            ResourceKind::Deployment => self.deployment(),
            ResourceKind::Service => self.service(),
            ResourceKind::Ingress => self.ingress(),
            ResourceKind::CronJob => self.cron_job(),
            ResourceKind::Job | ResourceKind::Pod => self.base.clone(),
        }
    }

    pub fn monitor_selector(&self) -> String {
        format!("{MONITOR_LABEL}={}", self.base)
    }

    fn suffixed(&self, suffix: &str) -> String {
        format!("{}-{}", self.base, suffix)
    }
}

/// Inverse of [`ResourceNames::deployment`]: the app label owning a workload.
pub fn app_from_deployment_name(name: &str) -> Option<&str> {
    name.strip_suffix("-deployment").filter(|s| !s.is_empty())
}

/// Host part of an ingress rule for a managed instance. The `postgres.`
/// prefix goes on the host, not on the resource name.
pub fn managed_host(code: &str) -> String {
    format!("{MANAGED_PREFIX}.{code}")
}
