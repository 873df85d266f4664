use crate::{
    api::{handlers, with_middleware},
    config::ServerConfig,
    services::{ProvisionService, StatusService},
};
use axum::{
    Json, Router,
    routing::{get, post},
};
use kaas_observability::ServiceHealth;
use std::{future::Future, net::SocketAddr, sync::Arc};
use tracing::info;

pub const SERVICE_NAME: &str = "kaas-api";

#[derive(Clone)]
pub struct AppState {
    pub provision_service: Arc<ProvisionService>,
    pub status_service: Arc<StatusService>,
}

pub struct ApiServer {
    app: Router,
    config: ServerConfig,
}

impl ApiServer {
    pub fn new(
        provision_service: Arc<ProvisionService>,
        status_service: Arc<StatusService>,
        config: ServerConfig,
    ) -> Self {
        let state = AppState {
            provision_service,
            status_service,
        };

        let app = Router::new()
            .route("/deploy-unmanaged", post(handlers::deploy_unmanaged))
            .route("/deploy-managed", post(handlers::deploy_managed))
            .route("/get-deployment/{app_name}", get(handlers::get_deployment))
            .route("/get-all-deployments", get(handlers::get_all_deployments))
            .route("/health", get(health_check));
        let app = with_middleware(app).with_state(state);

        Self { app, config }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr =
            format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("KaaS API server listening on {}", addr);
        info!("Health check available at: http://{}/health", addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    /// Consume and return the underlying router, e.g. to drive it with
    /// `oneshot` in tests.
    pub fn into_router(self) -> Router {
        self.app
    }
}

async fn health_check() -> Json<ServiceHealth> {
    Json(ServiceHealth::healthy(
        SERVICE_NAME,
        env!("CARGO_PKG_VERSION"),
    ))
}
