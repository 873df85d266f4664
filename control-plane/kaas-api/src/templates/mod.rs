//! Resource descriptors for one provisioning request.
//!
//! Everything in here is pure: request data goes in, `k8s_openapi` objects
//! come out. Submitting them is the orchestrator's job.

pub mod manager;
pub mod naming;

pub use manager::*;
pub use naming::*;

use crate::cluster::ResourceKind;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;

#[derive(Clone, Debug, PartialEq)]
pub enum RenderedResource {
    ConfigMap(ConfigMap),
    Secret(Secret),
    Deployment(Deployment),
    Service(Service),
    Ingress(Ingress),
    CronJob(CronJob),
}

impl RenderedResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            RenderedResource::ConfigMap(_) => ResourceKind::ConfigMap,
            RenderedResource::Secret(_) => ResourceKind::Secret,
            RenderedResource::Deployment(_) => ResourceKind::Deployment,
            RenderedResource::Service(_) => ResourceKind::Service,
            RenderedResource::Ingress(_) => ResourceKind::Ingress,
            RenderedResource::CronJob(_) => ResourceKind::CronJob,
        }
    }

    pub fn name(&self) -> &str {
        let name = match self {
            RenderedResource::ConfigMap(r) => r.metadata.name.as_deref(),
            RenderedResource::Secret(r) => r.metadata.name.as_deref(),
            RenderedResource::Deployment(r) => r.metadata.name.as_deref(),
            RenderedResource::Service(r) => r.metadata.name.as_deref(),
            RenderedResource::Ingress(r) => r.metadata.name.as_deref(),
            RenderedResource::CronJob(r) => r.metadata.name.as_deref(),
        };
        name.unwrap_or_default()
    }
}
