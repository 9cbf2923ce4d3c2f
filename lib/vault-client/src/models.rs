use serde::Deserialize;
use std::time::Duration;

/// Parsed reply of a single Vault API call.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    path: String,
    status: u16,
    body: Option<serde_json::Value>,
}

impl Response {
    pub fn new(path: impl Into<String>, status: u16, body: Option<serde_json::Value>) -> Self {
        Self {
            path: path.into(),
            status,
            body,
        }
    }

    /// Path the request was issued for, relative to the API version segment.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whole decoded body, `None` when the service answered without one (e.g. 204).
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Decoded payload: the `data` field of the body.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.field("data").filter(|v| !v.is_null())
    }

    pub fn into_data(self) -> Option<serde_json::Value> {
        match self.body {
            Some(serde_json::Value::Object(mut map)) => {
                map.remove("data").filter(|v| !v.is_null())
            }
            _ => None,
        }
    }

    pub fn lease_id(&self) -> Option<&str> {
        self.field("lease_id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn lease_duration(&self) -> Option<Duration> {
        self.field("lease_duration")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs)
    }

    pub fn renewable(&self) -> bool {
        self.field("renewable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.field("warnings")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|w| w.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `auth` block of login and renew responses.
    pub fn auth(&self) -> Option<AuthData> {
        self.field("auth")
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.body.as_ref().and_then(|b| b.get(name))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthData {
    pub client_token: String,
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default)]
    pub policies: Vec<String>,
}
