// src/secrets/resolver.rs

use super::{collect_usages, JsonPathKey, Location, SecretUsage};
use crate::error::ConfigInjectionError;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use vault_client::VaultClient;

/// Replace every secret-reference marker in `config` with the value it points at.
///
/// The tree is mutated in place and only if every marker resolves: on error it is left
/// exactly as it was passed in. Each distinct path is read once, all paths concurrently.
/// Returns the number of markers replaced.
pub async fn fill_node_config(
    client: &VaultClient,
    config: &mut serde_json::Value,
) -> Result<usize, ConfigInjectionError> {
    let (usages, mut errors) = collect_usages(config);
    if usages.is_empty() {
        return match ConfigInjectionError::from_failures(errors) {
            Some(err) => Err(err),
            None => Ok(0),
        };
    }

    let paths: BTreeSet<&str> = usages
        .iter()
        .map(|usage| usage.reference.path.as_str())
        .collect();

    tracing::debug!(markers = usages.len(), paths = paths.len(), "Resolving secrets");

    let fetched = join_all(paths.into_iter().map(|path| async move {
        (path, client.read(path).await)
    }))
    .await;

    let mut secrets: HashMap<&str, serde_json::Value> = HashMap::new();
    for (path, result) in fetched {
        match result {
            Ok(response) => {
                secrets.insert(path, response.into_data().unwrap_or(serde_json::Value::Null));
            }
            Err(e) if e.is_not_found() => errors.push(ConfigInjectionError::SecretNotFound {
                path: path.to_string(),
            }),
            Err(e) => errors.push(ConfigInjectionError::Vault {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    let mut resolved: Vec<(&SecretUsage, serde_json::Value)> = Vec::with_capacity(usages.len());
    for usage in &usages {
        let reference = &usage.reference;
        let Some(data) = secrets.get(reference.path.as_str()) else {
            continue;
        };
        match data.get(&reference.key) {
            Some(value) => resolved.push((usage, value.clone())),
            None => errors.push(ConfigInjectionError::SecretKeyNotFound {
                path: reference.path.clone(),
                key: reference.key.clone(),
            }),
        }
    }

    if let Some(err) = ConfigInjectionError::from_failures(errors) {
        tracing::warn!(error = %err, "Secret injection aborted");
        return Err(err);
    }

    let mut updated = config.clone();
    for (usage, value) in resolved {
        set_at_path(&mut updated, &usage.value_path, value)?;
    }
    *config = updated;

    tracing::info!(markers = usages.len(), "Injected secrets into configuration");
    Ok(usages.len())
}

/// `fill_node_config` as a method on the client.
#[async_trait]
pub trait FillNodeConfig {
    async fn fill_node_config(
        &self,
        config: &mut serde_json::Value,
    ) -> Result<usize, ConfigInjectionError>;
}

#[async_trait]
impl FillNodeConfig for VaultClient {
    async fn fill_node_config(
        &self,
        config: &mut serde_json::Value,
    ) -> Result<usize, ConfigInjectionError> {
        fill_node_config(self, config).await
    }
}

/// Set value at the given JSON path
fn set_at_path(
    root: &mut serde_json::Value,
    path: &[JsonPathKey],
    value: serde_json::Value,
) -> Result<(), ConfigInjectionError> {
    let invalid = || ConfigInjectionError::InvalidSecretPath {
        location: Location(path).to_string(),
    };

    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;

    // Navigate to the parent of the target
    for key in parents {
        current = match key {
            JsonPathKey::Field(f) => current.get_mut(f).ok_or_else(invalid)?,
            JsonPathKey::Index(i) => current.get_mut(i).ok_or_else(invalid)?,
        };
    }

    // Overwrite in place so key order is kept
    let slot = match last {
        JsonPathKey::Field(f) => current
            .as_object_mut()
            .and_then(|map| map.get_mut(f))
            .ok_or_else(invalid)?,
        JsonPathKey::Index(i) => current
            .as_array_mut()
            .and_then(|items| items.get_mut(*i))
            .ok_or_else(invalid)?,
    };
    *slot = value;

    Ok(())
}
