use crate::services::ProvisionSettings;
use crate::templates::ProbeSettings;
use anyhow::Result;
use envconfig::Envconfig;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Envconfig)]
pub struct AppConfig {
    // Server configuration
    #[envconfig(from = "SERVER_HOST", default = "0.0.0.0")]
    pub server_host: String,

    #[envconfig(from = "SERVER_PORT", default = "8080")]
    pub server_port: u16,

    // Cluster configuration
    #[envconfig(from = "KAAS_NAMESPACE", default = "default")]
    pub namespace: String,

    #[envconfig(from = "KAAS_CLUSTER_BACKEND", default = "kube")]
    pub cluster_backend: String,

    #[envconfig(from = "KAAS_CALL_TIMEOUT_SECS", default = "10")]
    pub call_timeout_secs: u64,

    // Provisioning
    #[envconfig(from = "KAAS_INGRESS_SUFFIX", default = "kaas.local")]
    pub ingress_suffix: String,

    #[envconfig(from = "KAAS_CODE_MAX_ATTEMPTS", default = "16")]
    pub code_max_attempts: u32,

    #[envconfig(from = "KAAS_PASSWORD_LENGTH", default = "16")]
    pub password_length: usize,

    // Health monitoring
    #[envconfig(from = "KAAS_MONITOR_INTERVAL_SECS", default = "30")]
    pub monitor_interval_secs: u64,

    #[envconfig(from = "KAAS_PROBE_INTERVAL_SECS", default = "5")]
    pub probe_interval_secs: u64,

    #[envconfig(from = "KAAS_PROBE_IMAGE", default = "curlimages/curl:8.10.1")]
    pub probe_image: String,

    // Observability
    #[envconfig(from = "LOG_LEVEL", default = "info")]
    pub log_level: String,

    #[envconfig(from = "LOG_FORMAT", default = "plain")]
    pub log_format: String,
}

impl AppConfig {
    /// Load configuration from environment variables only
    pub fn load_from_env() -> Result<Self> {
        let config = Self::init_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later, per request.
    pub fn validate(&self) -> Result<()> {
        if self.password_length == 0 {
            anyhow::bail!("KAAS_PASSWORD_LENGTH must be greater than zero");
        }
        Ok(())
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.server_host.clone(),
            port: self.server_port,
        }
    }

    pub fn cluster(&self) -> ClusterConfig {
        let backend = match self.cluster_backend.to_lowercase().as_str() {
            "kube" | "k8s" | "kubernetes" => ClusterBackend::Kube,
            "memory" => ClusterBackend::Memory,
            other => {
                warn!(
                    "Unrecognized cluster backend '{}', falling back to 'kube'.",
                    other
                );
                ClusterBackend::Kube
            }
        };
        ClusterConfig {
            backend,
            namespace: self.namespace.clone(),
            call_timeout: Duration::from_secs(self.call_timeout_secs.max(1)),
        }
    }

    pub fn provision(&self) -> ProvisionConfig {
        ProvisionConfig {
            code_max_attempts: self.code_max_attempts,
            settings: ProvisionSettings {
                ingress_suffix: self.ingress_suffix.clone(),
                password_length: self.password_length,
                probe: ProbeSettings {
                    image: self.probe_image.clone(),
                    interval_secs: self.probe_interval_secs,
                    ..ProbeSettings::default()
                },
            },
        }
    }

    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.monitor_interval_secs.max(1)),
        }
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterBackend {
    Kube,
    Memory,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub backend: ClusterBackend,
    pub namespace: String,
    pub call_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    pub code_max_attempts: u32,
    pub settings: ProvisionSettings,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 13] = [
        "SERVER_HOST",
        "SERVER_PORT",
        "KAAS_NAMESPACE",
        "KAAS_CLUSTER_BACKEND",
        "KAAS_CALL_TIMEOUT_SECS",
        "KAAS_INGRESS_SUFFIX",
        "KAAS_CODE_MAX_ATTEMPTS",
        "KAAS_PASSWORD_LENGTH",
        "KAAS_MONITOR_INTERVAL_SECS",
        "KAAS_PROBE_INTERVAL_SECS",
        "KAAS_PROBE_IMAGE",
        "LOG_LEVEL",
        "LOG_FORMAT",
    ];

    fn clear() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn defaults() {
        clear();
        let config = AppConfig::load_from_env().unwrap();
        assert_eq!(config.server().host, "0.0.0.0");
        assert_eq!(config.server().port, 8080);

        let cluster = config.cluster();
        assert_eq!(cluster.backend, ClusterBackend::Kube);
        assert_eq!(cluster.namespace, "default");
        assert_eq!(cluster.call_timeout, Duration::from_secs(10));

        let provision = config.provision();
        assert_eq!(provision.code_max_attempts, 16);
        assert_eq!(provision.settings, ProvisionSettings::default());
        assert_eq!(config.monitor().interval, Duration::from_secs(30));
        assert!(!config.json_logs());
    }

    #[test]
    #[serial]
    fn overrides() {
        clear();
        unsafe {
            env::set_var("SERVER_PORT", "3000");
            env::set_var("KAAS_CLUSTER_BACKEND", "Memory");
            env::set_var("KAAS_INGRESS_SUFFIX", "apps.example.org");
            env::set_var("KAAS_PROBE_INTERVAL_SECS", "10");
            env::set_var("LOG_FORMAT", "JSON");
        }
        let config = AppConfig::load_from_env().unwrap();
        assert_eq!(config.server().port, 3000);
        assert_eq!(config.cluster().backend, ClusterBackend::Memory);
        let settings = config.provision().settings;
        assert_eq!(settings.ingress_suffix, "apps.example.org");
        assert_eq!(settings.probe.interval_secs, 10);
        assert!(config.json_logs());
        clear();
    }

    #[test]
    #[serial]
    fn unknown_backend_falls_back_to_kube() {
        clear();
        unsafe {
            env::set_var("KAAS_CLUSTER_BACKEND", "etcd");
        }
        let config = AppConfig::load_from_env().unwrap();
        assert_eq!(config.cluster().backend, ClusterBackend::Kube);
        clear();
    }

    #[test]
    #[serial]
    fn zero_password_length_is_rejected() {
        clear();
        unsafe {
            env::set_var("KAAS_PASSWORD_LENGTH", "0");
        }
        let err = AppConfig::load_from_env().unwrap_err();
        assert!(err.to_string().contains("KAAS_PASSWORD_LENGTH"));
        clear();
    }

    #[test]
    #[serial]
    fn malformed_number_is_an_error() {
        clear();
        unsafe {
            env::set_var("SERVER_PORT", "eighty");
        }
        assert!(AppConfig::load_from_env().is_err());
        clear();
    }
}
