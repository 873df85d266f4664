use super::naming::{
    APP_LABEL, MANAGED_BY, MANAGED_BY_LABEL, MONITOR_LABEL, ResourceNames,
};
use k8s_openapi::ByteString;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::batch::v1::{CronJob, CronJobSpec, JobSpec, JobTemplateSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapKeySelector, Container, ContainerPort, EnvVar,
    EnvVarSource, PodSpec, PodTemplateSpec, ResourceRequirements, Secret,
    SecretKeySelector, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kaas_models::{PartitionedEnv, ResourceLimits};
use std::collections::BTreeMap;

pub const HEALTH_PATH: &str = "/healthz";

/// What runs inside the workload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub image: String,
    pub replicas: i32,
    pub port: i32,
    pub limits: ResourceLimits,
}

impl WorkloadSpec {
    pub fn new(
        image_address: &str,
        image_tag: &str,
        replicas: i32,
        port: i32,
        limits: ResourceLimits,
    ) -> Self {
        Self {
            image: format!("{image_address}:{image_tag}"),
            replicas,
            port,
            limits,
        }
    }
}

/// How the periodic health-check job probes the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeSettings {
    pub image: String,
    pub schedule: String,
    pub interval_secs: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            image: "curlimages/curl:8.10.1".to_string(),
            schedule: "* * * * *".to_string(),
            interval_secs: 5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RenderContext<'a> {
    pub names: &'a ResourceNames,
    pub workload: &'a WorkloadSpec,
    pub env: &'a PartitionedEnv,
    /// Ingress host without the domain suffix. `None` means no ingress.
    pub ingress_host: Option<&'a str>,
    pub ingress_suffix: &'a str,
    /// `None` means no health-check job.
    pub probe: Option<&'a ProbeSettings>,
}

/// All descriptors produced for one request.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceSet {
    pub config_map: ConfigMap,
    pub secret: Secret,
    pub deployment: Deployment,
    pub service: Service,
    pub ingress: Option<Ingress>,
    pub cron_job: Option<CronJob>,
}

impl ResourceSet {
    pub fn render(ctx: &RenderContext<'_>) -> Self {
        Self {
            config_map: render_config_map(ctx.names, &ctx.env.config),
            secret: render_secret(ctx.names, &ctx.env.secret),
            deployment: render_deployment(ctx.names, ctx.workload, ctx.env),
            service: render_service(ctx.names, ctx.workload.port),
            ingress: ctx.ingress_host.map(|host| {
                render_ingress(
                    ctx.names,
                    &external_host(host, ctx.ingress_suffix),
                    ctx.workload.port,
                )
            }),
            cron_job: ctx
                .probe
                .map(|p| render_cron_job(ctx.names, ctx.workload.port, p)),
        }
    }
}

pub fn external_host(host: &str, suffix: &str) -> String {
    format!("{host}.{suffix}")
}

fn labels(names: &ResourceNames) -> BTreeMap<String, String> {
    let mut lbls = BTreeMap::new();
    lbls.insert(APP_LABEL.to_string(), names.label().to_string());
    lbls.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string());
    lbls
}

fn meta(name: String, names: &ResourceNames) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        labels: Some(labels(names)),
        ..Default::default()
    }
}

pub fn render_config_map(
    names: &ResourceNames,
    data: &BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: meta(names.config(), names),
        data: Some(data.clone()),
        ..Default::default()
    }
}

/// Secret values go in `data`, so they are standard base64 on the wire.
pub fn render_secret(
    names: &ResourceNames,
    data: &BTreeMap<String, String>,
) -> Secret {
    let data = data
        .iter()
        .map(|(k, v)| (k.clone(), ByteString(v.as_bytes().to_vec())))
        .collect();
    Secret {
        metadata: meta(names.secret(), names),
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    }
}

/// One env var per key, ordered by key. Values are referenced from the
/// config map and secret rather than inlined.
pub fn render_env(names: &ResourceNames, env: &PartitionedEnv) -> Vec<EnvVar> {
    let config_name = names.config();
    let secret_name = names.secret();
    let mut vars: Vec<EnvVar> = env
        .config
        .keys()
        .map(|key| EnvVar {
            name: key.clone(),
            value_from: Some(EnvVarSource {
                config_map_key_ref: Some(ConfigMapKeySelector {
                    name: config_name.clone(),
                    key: key.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
        .chain(env.secret.keys().map(|key| EnvVar {
            name: key.clone(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret_name.clone(),
                    key: key.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .collect();
    // stable sort keeps config before secret on a shared key
    vars.sort_by(|a, b| a.name.cmp(&b.name));
    vars
}

fn render_resources(limits: &ResourceLimits) -> Option<ResourceRequirements> {
    let mut list = BTreeMap::new();
    if !limits.cpu.is_empty() {
        list.insert("cpu".to_string(), Quantity(limits.cpu.clone()));
    }
    if !limits.ram.is_empty() {
        list.insert("memory".to_string(), Quantity(limits.ram.clone()));
    }
    if list.is_empty() {
        return None;
    }
    Some(ResourceRequirements {
        limits: Some(list.clone()),
        requests: Some(list),
        ..Default::default()
    })
}

pub fn render_deployment(
    names: &ResourceNames,
    workload: &WorkloadSpec,
    env: &PartitionedEnv,
) -> Deployment {
    let mut selector_lbls = BTreeMap::new();
    selector_lbls.insert(APP_LABEL.to_string(), names.label().to_string());
    let env_vars = render_env(names, env);

    let container = Container {
        name: names.label().to_string(),
        image: Some(workload.image.clone()),
        ports: Some(vec![ContainerPort {
            container_port: workload.port,
            ..Default::default()
        }]),
        resources: render_resources(&workload.limits),
        env: if env_vars.is_empty() {
            None
        } else {
            Some(env_vars)
        },
        ..Default::default()
    };

    Deployment {
        metadata: meta(names.deployment(), names),
        spec: Some(DeploymentSpec {
            replicas: Some(workload.replicas),
            selector: LabelSelector {
                match_labels: Some(selector_lbls),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels(names)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn render_service(names: &ResourceNames, port: i32) -> Service {
    let mut selector = BTreeMap::new();
    selector.insert(APP_LABEL.to_string(), names.label().to_string());
    Service {
        metadata: meta(names.service(), names),
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(vec![ServicePort {
                port,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn render_ingress(names: &ResourceNames, host: &str, port: i32) -> Ingress {
    Ingress {
        metadata: meta(names.ingress(), names),
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: names.service(),
                                port: Some(ServiceBackendPort {
                                    number: Some(port),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Shell loop run by each probe job. Every round prints one
/// `HTTP/1.1 <code>` line; curl reports `000` when the service is unreachable.
pub fn probe_script(url: &str, interval_secs: u64) -> String {
    let interval = interval_secs.max(1);
    let rounds = (60 / interval).saturating_sub(1).max(1);
    format!(
        "for i in $(seq 1 {rounds}); do \
         curl -s -o /dev/null --max-time {interval} -w 'HTTP/1.1 %{{http_code}}\\n' {url}; \
         sleep {interval}; done"
    )
}

pub fn render_cron_job(
    names: &ResourceNames,
    port: i32,
    probe: &ProbeSettings,
) -> CronJob {
    let mut job_lbls = labels(names);
    job_lbls.insert(MONITOR_LABEL.to_string(), names.label().to_string());
    let url = format!("http://{}:{}{}", names.service(), port, HEALTH_PATH);

    let probe_container = Container {
        name: "probe".to_string(),
        image: Some(probe.image.clone()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            probe_script(&url, probe.interval_secs),
        ]),
        ..Default::default()
    };

    CronJob {
        metadata: meta(names.cron_job(), names),
        spec: Some(CronJobSpec {
            schedule: probe.schedule.clone(),
            concurrency_policy: Some("Forbid".to_string()),
            job_template: JobTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(job_lbls.clone()),
                    ..Default::default()
                }),
                spec: Some(JobSpec {
                    backoff_limit: Some(0),
                    template: PodTemplateSpec {
                        metadata: Some(ObjectMeta {
                            labels: Some(job_lbls),
                            ..Default::default()
                        }),
                        spec: Some(PodSpec {
                            restart_policy: Some("Never".to_string()),
                            containers: vec![probe_container],
                            ..Default::default()
                        }),
                    },
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use kaas_models::EnvironmentEntry;

    fn demo_env() -> PartitionedEnv {
        PartitionedEnv::partition(&[
            EnvironmentEntry::plain("MODE", "prod"),
            EnvironmentEntry::secret("DB_PASSWORD", "s3cret"),
            EnvironmentEntry::plain("A_FIRST", "1"),
        ])
    }

    fn demo_workload() -> WorkloadSpec {
        WorkloadSpec::new(
            "nginx",
            "stable",
            2,
            80,
            ResourceLimits::new("250m", "256Mi"),
        )
    }

    fn render(
        ingress_host: Option<&str>,
        probe: Option<&ProbeSettings>,
    ) -> ResourceSet {
        let names = ResourceNames::new("demo");
        let env = demo_env();
        let workload = demo_workload();
        ResourceSet::render(&RenderContext {
            names: &names,
            workload: &workload,
            env: &env,
            ingress_host,
            ingress_suffix: "kaas.local",
            probe,
        })
    }

    #[test]
    fn renders_core_resources_with_derived_names() {
        let set = render(None, None);
        assert_eq!(set.config_map.metadata.name.as_deref(), Some("demo-config"));
        assert_eq!(set.secret.metadata.name.as_deref(), Some("demo-secret"));
        assert_eq!(
            set.deployment.metadata.name.as_deref(),
            Some("demo-deployment")
        );
        assert_eq!(set.service.metadata.name.as_deref(), Some("demo-service"));
        assert!(set.ingress.is_none());
        assert!(set.cron_job.is_none());
    }

    #[test]
    fn secret_data_is_standard_base64_on_the_wire() {
        let set = render(None, None);
        let v = serde_json::to_value(&set.secret).unwrap();
        assert_eq!(v["data"]["DB_PASSWORD"], STANDARD.encode("s3cret"));
        assert!(v.get("stringData").is_none());
        let cm = set.config_map.data.unwrap();
        assert_eq!(cm.get("MODE").map(String::as_str), Some("prod"));
        assert!(!cm.contains_key("DB_PASSWORD"));
    }

    #[test]
    fn deployment_carries_image_port_limits_and_sorted_env() {
        let set = render(None, None);
        let spec = set.deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(2));
        let pod = spec.template.spec.unwrap();
        let c = &pod.containers[0];
        assert_eq!(c.image.as_deref(), Some("nginx:stable"));
        assert_eq!(c.ports.as_ref().unwrap()[0].container_port, 80);

        let res = c.resources.as_ref().unwrap();
        assert_eq!(res.limits, res.requests);
        let limits = res.limits.as_ref().unwrap();
        assert_eq!(limits["cpu"], Quantity("250m".into()));
        assert_eq!(limits["memory"], Quantity("256Mi".into()));

        let env = c.env.as_ref().unwrap();
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A_FIRST", "DB_PASSWORD", "MODE"]);
        let db = env[1].value_from.as_ref().unwrap();
        assert_eq!(db.secret_key_ref.as_ref().unwrap().name, "demo-secret");
        let mode = env[2].value_from.as_ref().unwrap();
        assert_eq!(mode.config_map_key_ref.as_ref().unwrap().name, "demo-config");
    }

    #[test]
    fn service_selects_workload_pods() {
        let set = render(None, None);
        let svc = set.service.spec.unwrap();
        let dep_labels = set
            .deployment
            .spec
            .unwrap()
            .template
            .metadata
            .unwrap()
            .labels
            .unwrap();
        for (k, v) in svc.selector.unwrap() {
            assert_eq!(dep_labels.get(&k), Some(&v));
        }
        let port = &svc.ports.unwrap()[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.target_port, Some(IntOrString::Int(80)));
    }

    #[test]
    fn ingress_routes_root_to_service() {
        let set = render(Some("shop"), None);
        let ing = set.ingress.unwrap();
        assert_eq!(ing.metadata.name.as_deref(), Some("demo-ingress"));
        let rule = &ing.spec.unwrap().rules.unwrap()[0];
        assert_eq!(rule.host.as_deref(), Some("shop.kaas.local"));
        let path = &rule.http.as_ref().unwrap().paths[0];
        assert_eq!(path.path.as_deref(), Some("/"));
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "demo-service");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(80));
    }

    #[test]
    fn cron_job_is_labelled_for_the_reaper() {
        let probe = ProbeSettings::default();
        let set = render(None, Some(&probe));
        let cj = set.cron_job.unwrap();
        assert_eq!(cj.metadata.name.as_deref(), Some("demo-cronjob"));
        let spec = cj.spec.unwrap();
        let job_labels = spec.job_template.metadata.unwrap().labels.unwrap();
        assert_eq!(job_labels.get(MONITOR_LABEL).map(String::as_str), Some("demo"));
        let pod = spec.job_template.spec.unwrap().template.spec.unwrap();
        let cmd = pod.containers[0].command.clone().unwrap();
        assert!(cmd[2].contains("http://demo-service:80/healthz"));
        assert!(cmd[2].contains("sleep 5"));
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
    }

    #[test]
    fn empty_limits_are_omitted() {
        let names = ResourceNames::new("bare");
        let workload =
            WorkloadSpec::new("busybox", "1", 1, 8080, ResourceLimits::default());
        let dep = render_deployment(&names, &workload, &PartitionedEnv::default());
        let c = &dep.spec.unwrap().template.spec.unwrap().containers[0];
        assert!(c.resources.is_none());
        assert!(c.env.is_none());
    }
}
