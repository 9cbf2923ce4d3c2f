use crate::auth::AuthConfig;
use crate::request::RequestOptions;
use serde::Deserialize;

/// Client settings as they appear in an application's configuration file.
///
/// ```json
/// {
///   "api": { "url": "http://127.0.0.1:8200", "apiVersion": "v1" },
///   "auth": { "type": "appRole", "config": { "role_id": "..." } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    pub url: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub request_options: RequestOptions,
}
