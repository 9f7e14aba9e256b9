//! Credential acquisition for the inference service.
//!
//! One static API key, resolved from the host-provided secret source first
//! and the process environment second. Absence is a fatal configuration
//! error raised before any network activity.

use std::collections::HashMap;

use crate::SuggestError;

/// Environment variable holding the inference service API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// A read-only source of named secrets (host secret store, environment).
pub trait SecretSource {
    /// Look up a secret by name. Empty values count as absent.
    fn get(&self, key: &str) -> Option<String>;
}

/// Secrets from process environment variables.
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// In-memory secrets — the host's secret store hands these over, and tests
/// use them to avoid touching the real environment.
#[derive(Default)]
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl SecretSource for StaticSecrets {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Resolve the API key: host source first, then the environment source.
///
/// Production callers pass [`EnvSecrets`] as `env`; tests substitute
/// [`StaticSecrets`] for both so resolution never reads the real process
/// environment.
pub fn resolve_api_key(
    host: &dyn SecretSource,
    env: &dyn SecretSource,
) -> Result<String, SuggestError> {
    host.get(API_KEY_VAR)
        .or_else(|| env.get(API_KEY_VAR))
        .ok_or(SuggestError::MissingCredential)
}
