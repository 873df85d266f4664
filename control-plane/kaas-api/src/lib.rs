pub mod api;
pub mod bootstrap;
pub mod cluster;
pub mod config;
pub mod errors;
pub mod monitor;
pub mod server;
pub mod services;
pub mod templates;

pub use config::*;
pub use errors::*;
pub use server::{ApiServer, AppState};

pub use cluster::{ClusterClient, ClusterError, KubeCluster, MemoryCluster};
pub use monitor::MonitorRegistry;
pub use services::{ProvisionService, StatusService};

pub use bootstrap::{build_cluster, build_components};
