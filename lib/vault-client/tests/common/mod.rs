// lib/vault-client/tests/common/mod.rs

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use vault_client::VaultClient;
use wiremock::matchers::path_regex;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ROOT_TOKEN: &str = "root-token";

/// In-memory KV v1 engine mounted at `kv-v1`, enough to exercise read/write/list/delete.
#[derive(Clone, Default)]
pub struct KvBackend {
    secrets: Arc<Mutex<BTreeMap<String, serde_json::Value>>>,
}

impl KvBackend {
    pub async fn mount(server: &MockServer) -> Self {
        let backend = Self::default();
        Mock::given(path_regex(r"^/v1/kv-v1(/.*)?$"))
            .respond_with(backend.clone())
            .mount(server)
            .await;
        backend
    }

    pub fn insert(&self, key: &str, value: serde_json::Value) {
        self.secrets.lock().unwrap().insert(key.to_string(), value);
    }
}

impl Respond for KvBackend {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        if request.headers.get("x-vault-token").is_none() {
            return ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "errors": ["permission denied"]
            }));
        }

        let key = request
            .url
            .path()
            .trim_start_matches("/v1/kv-v1")
            .trim_matches('/')
            .to_string();
        let listing = request
            .url
            .query_pairs()
            .any(|(name, value)| name == "list" && value == "true");

        let mut secrets = self.secrets.lock().unwrap();
        match request.method.as_str() {
            "GET" if listing => {
                let prefix = if key.is_empty() {
                    String::new()
                } else {
                    format!("{}/", key)
                };
                let keys: Vec<String> = secrets
                    .keys()
                    .filter_map(|k| k.strip_prefix(&prefix))
                    .map(|rest| match rest.split_once('/') {
                        Some((dir, _)) => format!("{}/", dir),
                        None => rest.to_string(),
                    })
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect();
                if keys.is_empty() {
                    return not_found();
                }
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "request_id": "list",
                    "lease_id": "",
                    "renewable": false,
                    "lease_duration": 0,
                    "data": {"keys": keys},
                    "wrap_info": null,
                    "warnings": null,
                    "auth": null
                }))
            }
            "GET" => match secrets.get(&key) {
                Some(value) => ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "request_id": "read",
                    "lease_id": "",
                    "renewable": false,
                    "lease_duration": 2764800,
                    "data": value,
                    "wrap_info": null,
                    "warnings": null,
                    "auth": null
                })),
                None => not_found(),
            },
            "POST" | "PUT" => match serde_json::from_slice(&request.body) {
                Ok(value) => {
                    secrets.insert(key, value);
                    ResponseTemplate::new(204)
                }
                Err(_) => ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "errors": ["failed to parse JSON input"]
                })),
            },
            "DELETE" => {
                secrets.remove(&key);
                ResponseTemplate::new(204)
            }
            _ => ResponseTemplate::new(405),
        }
    }
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(serde_json::json!({"errors": []}))
}

pub fn auth_response(token: &str, lease_duration: u64, renewable: bool) -> serde_json::Value {
    serde_json::json!({
        "request_id": "auth",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "wrap_info": null,
        "warnings": null,
        "auth": {
            "client_token": token,
            "accessor": "accessor",
            "policies": ["default", "tst"],
            "token_policies": ["default", "tst"],
            "lease_duration": lease_duration,
            "renewable": renewable
        }
    })
}

pub async fn token_client(server: &MockServer) -> VaultClient {
    VaultClient::builder()
        .base_url(server.uri())
        .token(ROOT_TOKEN)
        .build()
        .await
        .unwrap()
}

pub async fn count_requests(server: &MockServer, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == path)
        .count()
}
