use crate::environment::{EnvironmentEntry, ResourceLimits};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Body of `POST /deploy-unmanaged`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionRequest {
    #[validate(custom(function = "validate_app_name"))]
    pub app_name: String,
    #[validate(range(min = 0, message = "Replicas cannot be negative"))]
    pub replicas: i32,
    #[validate(length(min = 1, message = "ImageAddress cannot be empty"))]
    pub image_address: String,
    #[validate(length(min = 1, message = "ImageTag cannot be empty"))]
    pub image_tag: String,
    #[serde(default)]
    pub domain_address: Option<String>,
    #[validate(range(min = 1, max = 65535, message = "ServicePort must be a valid port"))]
    pub service_port: i32,
    #[serde(default)]
    pub resources: ResourceLimits,
    #[serde(default)]
    #[validate(nested)]
    pub envs: Vec<EnvironmentEntry>,
    #[serde(default)]
    pub monitor: bool,
    #[serde(default)]
    pub external_access: bool,
}

impl ProvisionRequest {
    /// Naming key for every resource derived from this request.
    pub fn normalized_name(&self) -> String {
        self.app_name.trim().to_lowercase()
    }

    /// Caller-supplied domain, if any non-blank value was given.
    pub fn domain(&self) -> Option<&str> {
        self.domain_address
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Resource names are derived from the trimmed name, so blank counts as empty.
fn validate_app_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank_app_name");
        err.message = Some("AppName cannot be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Body of `POST /deploy-managed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedRequest {
    #[serde(default)]
    #[validate(nested)]
    pub envs: Vec<EnvironmentEntry>,
    #[serde(default)]
    pub external_access: bool,
}

/// Credentials and address handed back for a managed instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedResponse {
    pub username: String,
    pub password: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_json() -> &'static str {
        r#"{
            "AppName": "Demo",
            "Replicas": 2,
            "ImageAddress": "nginx",
            "ImageTag": "stable",
            "ServicePort": 80,
            "Resources": {"CPU": "250m", "RAM": "256Mi"},
            "Envs": [{"Key": "MODE", "Value": "prod", "IsSecret": false}],
            "ExternalAccess": false
        }"#
    }

    #[test]
    fn parses_pascal_case_body() {
        let req: ProvisionRequest = serde_json::from_str(demo_json()).unwrap();
        assert_eq!(req.app_name, "Demo");
        assert_eq!(req.resources, ResourceLimits::new("250m", "256Mi"));
        assert_eq!(req.envs.len(), 1);
        assert!(!req.monitor);
        assert!(req.domain().is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn name_is_lowercased() {
        let req: ProvisionRequest = serde_json::from_str(demo_json()).unwrap();
        assert_eq!(req.normalized_name(), "demo");
    }

    #[test]
    fn rejects_empty_app_name_and_bad_port() {
        let mut req: ProvisionRequest =
            serde_json::from_str(demo_json()).unwrap();
        req.app_name = String::new();
        req.service_port = 0;
        let errs = req.validate().unwrap_err();
        let fields = errs.field_errors();
        assert!(fields.contains_key("app_name"));
        assert!(fields.contains_key("service_port"));
    }

    #[test]
    fn whitespace_app_name_is_rejected() {
        let mut req: ProvisionRequest =
            serde_json::from_str(demo_json()).unwrap();
        req.app_name = "   ".into();
        let errs = req.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("app_name"));

        req.app_name = "  Shop ".into();
        assert!(req.validate().is_ok());
        assert_eq!(req.normalized_name(), "shop");
    }

    #[test]
    fn blank_domain_counts_as_missing() {
        let mut req: ProvisionRequest =
            serde_json::from_str(demo_json()).unwrap();
        req.domain_address = Some("  ".into());
        assert!(req.domain().is_none());
        req.domain_address = Some("shop".into());
        assert_eq!(req.domain(), Some("shop"));
    }
}
