use crate::cluster::{ClusterError, ResourceKind};
use thiserror::Error;
use tracing::error;

pub const INTERNAL_ERROR: &str = "Internal server error";
pub const BAD_REQUEST: &str = "Request body doesn't have correct format";

/// Which resource kind blocked a provisioning request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    SecretExists,
    ConfigExists,
    DeploymentExists,
    ServiceExists,
    IngressExists,
    CronJobExists,
}

impl ConflictReason {
    pub fn from_kind(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::Secret => Some(ConflictReason::SecretExists),
            ResourceKind::ConfigMap => Some(ConflictReason::ConfigExists),
            ResourceKind::Deployment => Some(ConflictReason::DeploymentExists),
            ResourceKind::Service => Some(ConflictReason::ServiceExists),
            ResourceKind::Ingress => Some(ConflictReason::IngressExists),
            ResourceKind::CronJob => Some(ConflictReason::CronJobExists),
            ResourceKind::Job | ResourceKind::Pod => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ConflictReason::SecretExists => "Secret already exists",
            ConflictReason::ConfigExists => "ConfigMap already exists",
            ConflictReason::DeploymentExists => "Deployment already exists",
            ConflictReason::ServiceExists => "Service already exists",
            ConflictReason::IngressExists => "Ingress already exists",
            ConflictReason::CronJobExists => "CronJob already exists",
        }
    }
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("{}", .0.message())]
    Conflict(ConflictReason),

    #[error("Deployment not found: {0}")]
    NotFound(String),

    #[error("No unused instance code found after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("Invalid credential configuration: {0}")]
    InvalidCredentialConfig(String),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

impl ProvisionError {
    /// A create rejected because the name is taken is a conflict, not a
    /// backend failure.
    pub fn from_create(err: ClusterError) -> Self {
        if let ClusterError::AlreadyExists { kind, .. } = &err {
            if let Some(reason) = ConflictReason::from_kind(*kind) {
                return ProvisionError::Conflict(reason);
            }
        }
        ProvisionError::Cluster(err)
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Conflict(reason) => {
                ApiError::Conflict(reason.message().to_string())
            }
            ProvisionError::NotFound(name) => {
                ApiError::NotFound(format!("Deployment not found: {name}"))
            }
            other => {
                error!(error = %other, "request failed");
                ApiError::InternalServerError
            }
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        use axum::{Json, http::StatusCode};
        use serde_json::json;

        // Conflicts and missing workloads share 406.
        let (status, error_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::NOT_ACCEPTABLE, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_ACCEPTABLE, msg),
            ApiError::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn create_collision_maps_to_kind_conflict() {
        let err = ProvisionError::from_create(ClusterError::AlreadyExists {
            kind: ResourceKind::ConfigMap,
            name: "demo-config".into(),
        });
        assert!(matches!(
            err,
            ProvisionError::Conflict(ConflictReason::ConfigExists)
        ));
        let err = ProvisionError::from_create(ClusterError::Backend("boom".into()));
        assert!(matches!(err, ProvisionError::Cluster(_)));
    }

    #[test]
    fn status_codes() {
        let conflict: ApiError =
            ProvisionError::Conflict(ConflictReason::IngressExists).into();
        assert_eq!(conflict.into_response().status(), StatusCode::NOT_ACCEPTABLE);

        let missing: ApiError = ProvisionError::NotFound("x".into()).into();
        assert_eq!(missing.into_response().status(), StatusCode::NOT_ACCEPTABLE);

        let exhausted: ApiError =
            ProvisionError::GenerationExhausted { attempts: 3 }.into();
        assert_eq!(
            exhausted.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let bad = ApiError::BadRequest(BAD_REQUEST.into());
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
