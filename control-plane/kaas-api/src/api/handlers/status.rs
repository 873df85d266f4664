use crate::{errors::ApiError, server::AppState};
use axum::{
    Json,
    extract::{Path, State},
};
use kaas_models::DeploymentStatus;
use tracing::debug;

pub async fn get_deployment(
    State(state): State<AppState>,
    Path(app_name): Path<String>,
) -> Result<Json<DeploymentStatus>, ApiError> {
    debug!(%app_name, "API: get deployment");
    let status = state.status_service.get_status(&app_name).await?;
    Ok(Json(status))
}

pub async fn get_all_deployments(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeploymentStatus>>, ApiError> {
    let statuses = state.status_service.get_all_statuses().await?;
    debug!(count = statuses.len(), "API: get all deployments");
    Ok(Json(statuses))
}
