use crate::cluster::ClusterClient;
use crate::templates::{JOB_NAME_LABEL, ResourceNames};
use k8s_openapi::api::batch::v1::Job;
use kaas_models::ProbeOutcome;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one finished health-check job reported before it was reclaimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLogRecord {
    pub job: String,
    pub pods: Vec<String>,
    pub outcome: ProbeOutcome,
}

/// Polls the health-check jobs of one app, reads their verdict from the pod
/// logs and deletes them.
#[derive(Clone)]
pub struct HealthReaper {
    cluster: Arc<dyn ClusterClient>,
    names: ResourceNames,
    interval: Duration,
}

impl HealthReaper {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        names: ResourceNames,
        interval: Duration,
    ) -> Self {
        Self {
            cluster,
            names,
            interval,
        }
    }

    pub fn app(&self) -> &str {
        self.names.base()
    }

    pub async fn run(self, token: CancellationToken) {
        info!(app = %self.app(), interval = ?self.interval, "health reaper started");
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                records = self.poll_once() => {
                    for r in &records {
                        info!(app = %self.app(), job = %r.job, outcome = ?r.outcome, "probe job reaped");
                    }
                }
            }
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!(app = %self.app(), "health reaper stopped");
    }

    /// One pass over the app's jobs. Jobs still running are left alone.
    /// Failures on a single job or pod are logged and skipped.
    pub async fn poll_once(&self) -> Vec<JobLogRecord> {
        let selector = self.names.monitor_selector();
        let jobs = match self.cluster.list_jobs(&selector).await {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(app = %self.app(), error = %e, "failed to list probe jobs");
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for job in jobs.iter().filter(|j| is_finished(j)) {
            let Some(job_name) = job.metadata.name.clone() else {
                continue;
            };
            records.push(self.reap(job_name).await);
        }
        records
    }

    async fn reap(&self, job: String) -> JobLogRecord {
        let selector = format!("{JOB_NAME_LABEL}={job}");
        let pods = match self.cluster.list_pods(Some(&selector)).await {
            Ok(pods) => pods
                .into_iter()
                .filter_map(|p| p.metadata.name)
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!(%job, error = %e, "failed to list probe pods");
                Vec::new()
            }
        };

        let mut outcome = ProbeOutcome::Unknown;
        for pod in &pods {
            match self.cluster.pod_logs(pod).await {
                Ok(log) => {
                    let parsed = parse_probe_outcome(&log);
                    if parsed != ProbeOutcome::Unknown {
                        outcome = parsed;
                    }
                }
                Err(e) => warn!(%job, %pod, error = %e, "failed to read probe log"),
            }
        }

        match self.cluster.delete_job(&job).await {
            Ok(()) => debug!(%job, "probe job deleted"),
            Err(e) if e.is_not_found() => debug!(%job, "probe job already gone"),
            Err(e) => warn!(%job, error = %e, "failed to delete probe job"),
        }

        JobLogRecord { job, pods, outcome }
    }
}

fn is_finished(job: &Job) -> bool {
    let Some(status) = job.status.as_ref() else {
        return false;
    };
    let terminal = status.conditions.as_ref().is_some_and(|conds| {
        conds.iter().any(|c| {
            (c.type_ == "Complete" || c.type_ == "Failed") && c.status == "True"
        })
    });
    if terminal || status.completion_time.is_some() {
        return true;
    }
    status.active.unwrap_or(0) == 0
        && (status.succeeded.unwrap_or(0) > 0 || status.failed.unwrap_or(0) > 0)
}

/// Last `HTTP/x.y NNN` status line in `log`. No such line gives
/// [`ProbeOutcome::Unknown`].
pub fn parse_probe_outcome(log: &str) -> ProbeOutcome {
    log.lines()
        .filter_map(status_code)
        .last()
        .map(ProbeOutcome::from_status_code)
        .unwrap_or(ProbeOutcome::Unknown)
}

fn status_code(line: &str) -> Option<u16> {
    let mut tokens = line.split_whitespace();
    while let Some(tok) = tokens.next() {
        let Some(version) = tok.strip_prefix("HTTP/") else {
            continue;
        };
        let valid_version = !version.is_empty()
            && version.chars().all(|c| c.is_ascii_digit() || c == '.');
        if !valid_version {
            continue;
        }
        let code = tokens.next()?;
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_digit()) {
            return code.parse().ok();
        }
        return None;
    }
    None
}
