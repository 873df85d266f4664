//! Background reclamation of health-check jobs.

pub mod reaper;

pub use reaper::{HealthReaper, JobLogRecord, parse_probe_outcome};

use crate::cluster::ClusterClient;
use crate::templates::ResourceNames;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct MonitorHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// One reaper task per monitored app, keyed by app name. Every task token is
/// a child of the registry token, so [`MonitorRegistry::shutdown`] reaches
/// all of them.
pub struct MonitorRegistry {
    cluster: Arc<dyn ClusterClient>,
    interval: Duration,
    root: CancellationToken,
    tasks: Mutex<HashMap<String, MonitorHandle>>,
}

impl MonitorRegistry {
    pub fn new(cluster: Arc<dyn ClusterClient>, interval: Duration) -> Self {
        Self {
            cluster,
            interval,
            root: CancellationToken::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Start a reaper for `names`. Returns `false` if one is already running
    /// for that app.
    pub async fn spawn(&self, names: &ResourceNames) -> bool {
        let app = names.base().to_string();
        let mut tasks = self.tasks.lock().await;
        if tasks.get(&app).is_some_and(|h| !h.task.is_finished()) {
            return false;
        }
        let token = self.root.child_token();
        let reaper =
            HealthReaper::new(self.cluster.clone(), names.clone(), self.interval);
        let task = tokio::spawn(reaper.run(token.clone()));
        tasks.insert(app, MonitorHandle { token, task });
        true
    }

    /// Cancel the reaper for `app`. Returns `false` if none was registered.
    pub async fn stop(&self, app: &str) -> bool {
        let handle = self.tasks.lock().await.remove(app);
        match handle {
            Some(h) => {
                h.token.cancel();
                if let Err(e) = h.task.await {
                    warn!(%app, error = %e, "reaper task ended abnormally");
                }
                true
            }
            None => false,
        }
    }

    pub async fn is_running(&self, app: &str) -> bool {
        self.tasks
            .lock()
            .await
            .get(app)
            .is_some_and(|h| !h.task.is_finished())
    }

    pub async fn running(&self) -> Vec<String> {
        let tasks = self.tasks.lock().await;
        let mut apps: Vec<String> = tasks
            .iter()
            .filter(|(_, h)| !h.task.is_finished())
            .map(|(app, _)| app.clone())
            .collect();
        apps.sort();
        apps
    }

    /// Cancel every reaper and wait for them to exit.
    pub async fn shutdown(&self) {
        let apps = self.running().await;
        debug!(?apps, "stopping health reapers");
        self.root.cancel();
        let drained: Vec<(String, MonitorHandle)> =
            self.tasks.lock().await.drain().collect();
        let count = drained.len();
        for (app, h) in drained {
            if let Err(e) = h.task.await {
                warn!(%app, error = %e, "reaper task ended abnormally");
            }
        }
        info!(count, "health reapers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryCluster;

    fn registry() -> MonitorRegistry {
        MonitorRegistry::new(
            Arc::new(MemoryCluster::new()),
            Duration::from_millis(20),
        )
    }

    #[tokio::test]
    async fn spawn_is_once_per_app() {
        let reg = registry();
        let names = ResourceNames::new("demo");
        assert!(reg.spawn(&names).await);
        assert!(!reg.spawn(&names).await);
        assert!(reg.is_running("demo").await);
        assert!(reg.spawn(&ResourceNames::new("shop")).await);
        assert_eq!(reg.running().await, vec!["demo", "shop"]);
        reg.shutdown().await;
    }

    #[tokio::test]
    async fn stop_cancels_one_app() {
        let reg = registry();
        reg.spawn(&ResourceNames::new("demo")).await;
        reg.spawn(&ResourceNames::new("shop")).await;
        assert!(reg.stop("demo").await);
        assert!(!reg.stop("demo").await);
        assert!(!reg.is_running("demo").await);
        assert!(reg.is_running("shop").await);
        reg.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_stops_everything() {
        let reg = registry();
        reg.spawn(&ResourceNames::new("a")).await;
        reg.spawn(&ResourceNames::new("b")).await;
        reg.shutdown().await;
        assert!(reg.running().await.is_empty());
    }
}
