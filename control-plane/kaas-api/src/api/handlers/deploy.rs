use crate::{
    errors::{ApiError, BAD_REQUEST},
    server::AppState,
};
use axum::{Json, extract::State, extract::rejection::JsonRejection};
use kaas_models::{ManagedRequest, ManagedResponse, ProvisionRequest};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use validator::Validate;

/// Unwraps a JSON body, mapping both parse and validation failures to 400.
fn accept<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError>
where
    T: DeserializeOwned + Validate,
{
    let Json(value) = body.map_err(|e| {
        warn!(error = %e, "rejected request body");
        ApiError::BadRequest(BAD_REQUEST.to_string())
    })?;
    value.validate().map_err(|e| {
        warn!(error = %e, "request failed validation");
        ApiError::BadRequest(BAD_REQUEST.to_string())
    })?;
    Ok(value)
}

pub async fn deploy_unmanaged(
    State(state): State<AppState>,
    body: Result<Json<ProvisionRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let request = accept(body)?;
    info!(
        app = %request.normalized_name(),
        image = %request.image_address,
        tag = %request.image_tag,
        "API: deploy unmanaged"
    );
    let message = state.provision_service.deploy_unmanaged(&request).await?;
    Ok(Json(message))
}

pub async fn deploy_managed(
    State(state): State<AppState>,
    body: Result<Json<ManagedRequest>, JsonRejection>,
) -> Result<Json<ManagedResponse>, ApiError> {
    let request = accept(body)?;
    info!(
        envs = request.envs.len(),
        external = request.external_access,
        "API: deploy managed"
    );
    let response = state.provision_service.deploy_managed(&request).await?;
    Ok(Json(response))
}
