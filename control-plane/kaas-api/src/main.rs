use anyhow::Result;
use clap::Command;
use kaas_api::{
    bootstrap::{build_cluster, build_components},
    config::AppConfig,
    server::SERVICE_NAME,
};
use kaas_observability::{TracingConfig, setup_tracing};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let _matches = Command::new(SERVICE_NAME)
        .about("KaaS provisioning API")
        .version(env!("CARGO_PKG_VERSION"))
        .get_matches();

    let config = AppConfig::load_from_env()?;

    let tracing_config =
        TracingConfig::from_env(SERVICE_NAME, &config.log_level, config.json_logs());
    setup_tracing(tracing_config)?;

    info!("Starting KaaS API with environment-based config");
    let cluster = build_cluster(&config.cluster()).await?;
    let components = build_components(&config, cluster);
    let monitors = components.monitors.clone();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    };

    let result = components.server.serve_with_shutdown(shutdown).await;
    monitors.shutdown().await;

    if let Err(e) = result {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
