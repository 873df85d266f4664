use serde::{Deserialize, Serialize};

/// Caller-facing summary of a workload and its pods.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DeploymentStatus {
    pub deployment_name: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub pod_statuses: Vec<PodStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodStatus {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Phase")]
    pub phase: String,
    #[serde(rename = "HostID")]
    pub host_ip: String,
    #[serde(rename = "PodIP")]
    pub pod_ip: String,
    #[serde(rename = "StartTime")]
    pub start_time: Option<String>,
}

/// Result of a single health probe run, as read back from job logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy(u16),
    Unhealthy(u16),
    Unknown,
}

impl ProbeOutcome {
    pub fn from_status_code(code: u16) -> Self {
        if (200..300).contains(&code) {
            ProbeOutcome::Healthy(code)
        } else {
            ProbeOutcome::Unhealthy(code)
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy(_))
    }
}
