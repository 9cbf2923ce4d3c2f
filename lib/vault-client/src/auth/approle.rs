use super::{login, AuthMethod, TokenInfo};
use crate::request::RequestExecutor;
use crate::VaultError;
use async_trait::async_trait;
use serde::Serialize;

const DEFAULT_MOUNT: &str = "approle";

/// AppRole authentication.
///
/// `secret_id` may be omitted for roles created with `bind_secret_id=false`.
pub struct AppRoleAuth {
    mount: String,
    role_id: String,
    secret_id: Option<String>,
}

impl AppRoleAuth {
    pub fn new(role_id: String, secret_id: Option<String>) -> Self {
        Self {
            mount: DEFAULT_MOUNT.to_string(),
            role_id,
            secret_id,
        }
    }

    pub fn with_mount(mut self, mount: String) -> Self {
        self.mount = mount;
        self
    }

    fn login_path(&self) -> String {
        format!("auth/{}/login", self.mount.trim_matches('/'))
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    role_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_id: Option<&'a str>,
}

#[async_trait]
impl AuthMethod for AppRoleAuth {
    async fn authenticate(&self, executor: &RequestExecutor) -> Result<TokenInfo, VaultError> {
        let body = serde_json::to_value(LoginRequest {
            role_id: &self.role_id,
            secret_id: self.secret_id.as_deref(),
        })?;

        login(executor, &self.login_path(), &body).await
    }

    fn supports_renewal(&self) -> bool {
        true
    }
}
