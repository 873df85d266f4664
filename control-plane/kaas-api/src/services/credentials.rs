use crate::cluster::ClusterClient;
use crate::errors::ProvisionError;
use crate::services::existence::CHECK_ORDER;
use crate::templates::ResourceNames;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::sync::Arc;
use tracing::{debug, warn};

pub const CODE_MIN: u32 = 10_000;
pub const CODE_MAX: u32 = 99_999;
pub const USERNAME_PREFIX: &str = "kaas_";
const USERNAME_SUFFIX_LEN: usize = 8;

const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SPECIAL: &str = "!@#$%^&*()-_=+[]{}<>?";

type CodeSource = Arc<dyn Fn() -> u32 + Send + Sync>;

/// Picks unused five digit codes for managed instances.
#[derive(Clone)]
pub struct InstanceCodeGenerator {
    max_attempts: u32,
    source: CodeSource,
}

impl std::fmt::Debug for InstanceCodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceCodeGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl InstanceCodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_source(max_attempts, || {
            rand::rng().random_range(CODE_MIN..=CODE_MAX)
        })
    }

    /// Draw candidates from `source` instead of the thread RNG.
    pub fn with_source<F>(max_attempts: u32, source: F) -> Self
    where
        F: Fn() -> u32 + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            source: Arc::new(source),
        }
    }

    /// A code is free when none of the resources a managed deploy creates
    /// exist under it. Any lookup error other than not-found aborts
    /// generation.
    pub async fn generate(
        &self,
        cluster: &dyn ClusterClient,
    ) -> Result<String, ProvisionError> {
        for attempt in 1..=self.max_attempts {
            let code = (self.source)().to_string();
            if is_code_free(cluster, &ResourceNames::managed(&code)).await? {
                debug!(%code, attempt, "instance code accepted");
                return Ok(code);
            }
            debug!(%code, attempt, "instance code taken, drawing again");
        }
        warn!(attempts = self.max_attempts, "instance code space exhausted");
        Err(ProvisionError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}

async fn is_code_free(
    cluster: &dyn ClusterClient,
    names: &ResourceNames,
) -> Result<bool, ProvisionError> {
    for kind in CHECK_ORDER {
        match cluster.lookup(kind, &names.for_kind(kind)).await {
            Err(e) if e.is_not_found() => continue,
            Ok(()) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}

/// Random password drawn from the union of the enabled character classes.
pub fn generate_password(
    length: usize,
    letters: bool,
    special: bool,
    numeric: bool,
) -> Result<String, ProvisionError> {
    if length == 0 {
        return Err(ProvisionError::InvalidCredentialConfig(
            "password length must be positive".to_string(),
        ));
    }
    let mut alphabet = String::new();
    if letters {
        alphabet.push_str(LETTERS);
    }
    if special {
        alphabet.push_str(SPECIAL);
    }
    if numeric {
        alphabet.push_str(DIGITS);
    }
    if alphabet.is_empty() {
        return Err(ProvisionError::InvalidCredentialConfig(
            "at least one character class must be enabled".to_string(),
        ));
    }
    let chars: Vec<char> = alphabet.chars().collect();
    let mut rng = rand::rng();
    Ok((0..length)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect())
}

/// `kaas_` followed by eight lowercase alphanumerics.
pub fn generate_username() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(USERNAME_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{USERNAME_PREFIX}{suffix}")
}
