use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// A single environment variable supplied with a provisioning request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct EnvironmentEntry {
    #[serde(rename = "Key")]
    #[validate(length(min = 1, message = "Environment key cannot be empty"))]
    pub key: String,
    #[serde(rename = "Value", default)]
    pub value: String,
    #[serde(rename = "IsSecret", default)]
    pub is_secret: bool,
}

impl EnvironmentEntry {
    pub fn plain(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_secret: false,
        }
    }

    pub fn secret(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            is_secret: true,
        }
    }
}

/// CPU and memory quantities, passed through to the cluster untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceLimits {
    #[serde(rename = "CPU", default)]
    pub cpu: String,
    #[serde(rename = "RAM", default)]
    pub ram: String,
}

impl ResourceLimits {
    pub fn new(cpu: impl Into<String>, ram: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            ram: ram.into(),
        }
    }
}

/// Environment entries split by their secret flag.
///
/// Both maps are ordered by key so that everything derived from them
/// (config data, secret data, container env) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionedEnv {
    pub config: BTreeMap<String, String>,
    pub secret: BTreeMap<String, String>,
}

impl PartitionedEnv {
    pub fn partition(entries: &[EnvironmentEntry]) -> Self {
        let mut out = Self::default();
        for entry in entries {
            let target = if entry.is_secret {
                &mut out.secret
            } else {
                &mut out.config
            };
            target.insert(entry.key.clone(), entry.value.clone());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.config.len() + self.secret.len()
    }

    pub fn is_empty(&self) -> bool {
        self.config.is_empty() && self.secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_total_and_disjoint() {
        let entries = vec![
            EnvironmentEntry::plain("MODE", "prod"),
            EnvironmentEntry::secret("DB_PASSWORD", "hunter2"),
            EnvironmentEntry::plain("LOG_LEVEL", "debug"),
            EnvironmentEntry::secret("API_TOKEN", "abc"),
        ];
        let env = PartitionedEnv::partition(&entries);

        assert_eq!(env.len(), entries.len());
        for e in &entries {
            let (hit, miss) = if e.is_secret {
                (&env.secret, &env.config)
            } else {
                (&env.config, &env.secret)
            };
            assert_eq!(hit.get(&e.key), Some(&e.value));
            assert!(!miss.contains_key(&e.key));
        }
    }

    #[test]
    fn partition_of_nothing_is_empty() {
        let env = PartitionedEnv::partition(&[]);
        assert!(env.is_empty());
    }

    #[test]
    fn is_secret_defaults_to_false() {
        let e: EnvironmentEntry =
            serde_json::from_str(r#"{"Key":"A","Value":"b"}"#).unwrap();
        assert!(!e.is_secret);
    }
}
