use super::{login, AuthMethod, TokenInfo};
use crate::request::RequestExecutor;
use crate::VaultError;
use async_trait::async_trait;
use serde::Serialize;

pub(crate) const DEFAULT_MOUNT: &str = "kubernetes";
const DEFAULT_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Kubernetes authentication
pub struct KubernetesAuth {
    pub mount: String,
    pub role: String,
    pub jwt_path: String,
}

impl KubernetesAuth {
    pub fn new(mount: String, role: String) -> Self {
        Self {
            mount,
            role,
            jwt_path: DEFAULT_JWT_PATH.to_string(),
        }
    }

    pub fn with_jwt_path(mut self, path: String) -> Self {
        self.jwt_path = path;
        self
    }

    fn read_jwt(&self) -> Result<String, VaultError> {
        std::fs::read_to_string(&self.jwt_path)
            .map(|s| s.trim().to_string())
            .map_err(|e| {
                VaultError::KubernetesError(format!(
                    "Failed to read JWT from {}: {}",
                    self.jwt_path, e
                ))
            })
    }
}

#[derive(Serialize)]
struct LoginRequest {
    jwt: String,
    role: String,
}

#[async_trait]
impl AuthMethod for KubernetesAuth {
    async fn authenticate(&self, executor: &RequestExecutor) -> Result<TokenInfo, VaultError> {
        let body = serde_json::to_value(LoginRequest {
            jwt: self.read_jwt()?,
            role: self.role.clone(),
        })?;

        let path = format!("auth/{}/login", self.mount.trim_matches('/'));
        login(executor, &path, &body).await
    }

    fn supports_renewal(&self) -> bool {
        true
    }
}
