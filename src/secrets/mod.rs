// src/secrets/mod.rs

pub mod resolver;

use crate::error::ConfigInjectionError;
use std::fmt;

pub use resolver::{fill_node_config, FillNodeConfig};

const COMPACT_MARKER: &str = "$secret";

/// Address of a single value stored in Vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub path: String,
    pub key: String,
}

impl SecretRef {
    /// Recognize a secret-reference marker.
    ///
    /// Two shapes are markers: an object with exactly the string fields `ref` and `key`,
    /// and the compact `{"$secret": "path:key"}`. Anything else is plain configuration.
    pub fn from_value(value: &serde_json::Value) -> Option<Result<SecretRef, String>> {
        let map = value.as_object()?;

        if map.len() == 2 {
            if let (Some(serde_json::Value::String(path)), Some(serde_json::Value::String(key))) =
                (map.get("ref"), map.get("key"))
            {
                return Some(Ok(SecretRef {
                    path: normalize(path),
                    key: key.clone(),
                }));
            }
        }

        if map.len() == 1 {
            if let Some(reference) = map.get(COMPACT_MARKER) {
                return Some(Self::parse_compact(reference));
            }
        }

        None
    }

    fn parse_compact(reference: &serde_json::Value) -> Result<SecretRef, String> {
        let text = reference.as_str().ok_or_else(|| reference.to_string())?;
        match text.split_once(':') {
            Some((path, key)) if !path.is_empty() && !key.is_empty() => Ok(SecretRef {
                path: normalize(path),
                key: key.to_string(),
            }),
            _ => Err(text.to_string()),
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

/// One step from a parent value to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPathKey {
    Field(String),
    Index(usize),
}

/// A marker found in a configuration tree, with where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct SecretUsage {
    pub value_path: Vec<JsonPathKey>,
    pub reference: SecretRef,
}

/// Renders a location like `/deep/aStr` or `/servers/0/password`.
pub struct Location<'a>(pub &'a [JsonPathKey]);

impl fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for key in self.0 {
            match key {
                JsonPathKey::Field(name) => write!(f, "/{}", name)?,
                JsonPathKey::Index(index) => write!(f, "/{}", index)?,
            }
        }
        Ok(())
    }
}

/// Walk `value` depth-first and collect every marker.
///
/// Malformed compact markers are collected as errors so they can be reported together.
pub fn collect_usages(
    value: &serde_json::Value,
) -> (Vec<SecretUsage>, Vec<ConfigInjectionError>) {
    let mut usages = Vec::new();
    let mut errors = Vec::new();
    let mut current = Vec::new();
    walk(value, &mut current, &mut usages, &mut errors);
    (usages, errors)
}

fn walk(
    value: &serde_json::Value,
    current: &mut Vec<JsonPathKey>,
    usages: &mut Vec<SecretUsage>,
    errors: &mut Vec<ConfigInjectionError>,
) {
    match SecretRef::from_value(value) {
        Some(Ok(reference)) => {
            usages.push(SecretUsage {
                value_path: current.clone(),
                reference,
            });
            return;
        }
        Some(Err(reference)) => {
            errors.push(ConfigInjectionError::InvalidSecretReference {
                location: Location(current).to_string(),
                reference,
            });
            return;
        }
        None => {}
    }

    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                current.push(JsonPathKey::Field(k.clone()));
                walk(v, current, usages, errors);
                current.pop();
            }
        }
        serde_json::Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                current.push(JsonPathKey::Index(i));
                walk(item, current, usages, errors);
                current.pop();
            }
        }
        _ => {}
    }
}
