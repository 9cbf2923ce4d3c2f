// src/error.rs
use thiserror::Error;
use vault_client::VaultError;

#[derive(Debug, Error)]
pub enum ConfigInjectionError {
    #[error("Secret not found: {path}")]
    SecretNotFound { path: String },

    #[error("Secret key not found: {key} in {path}")]
    SecretKeyNotFound { path: String, key: String },

    #[error("Invalid secret reference at {location}: {reference}")]
    InvalidSecretReference { location: String, reference: String },

    #[error("Invalid secret location: {location}")]
    InvalidSecretPath { location: String },

    #[error("Vault error reading {path}: {source}")]
    Vault {
        path: String,
        #[source]
        source: VaultError,
    },

    #[error("{} secret references could not be resolved: {}", .0.len(), join_errors(.0))]
    Unresolved(Vec<ConfigInjectionError>),
}

impl ConfigInjectionError {
    /// Collapse a list of failures into one error; `None` when the list is empty.
    pub(crate) fn from_failures(mut errors: Vec<ConfigInjectionError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ConfigInjectionError::Unresolved(errors)),
        }
    }
}

fn join_errors(errors: &[ConfigInjectionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
