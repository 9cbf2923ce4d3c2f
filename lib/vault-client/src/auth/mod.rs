mod approle;
mod kubernetes;
mod manager;
mod token;
mod token_info;

pub use approle::AppRoleAuth;
pub use kubernetes::KubernetesAuth;
pub use manager::{TokenManager, TokenManagerConfig};
pub use token::StaticTokenAuth;
pub use token_info::TokenInfo;

use crate::request::RequestExecutor;
use crate::VaultError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use std::time::Duration;

pub const TOKEN_HEADER: &str = "x-vault-token";
const RENEW_SELF_PATH: &str = "auth/token/renew-self";

/// Authentication settings, tagged the way client configuration files spell them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "config")]
pub enum AuthConfig {
    #[serde(rename = "token")]
    Token { token: String },

    #[serde(rename = "appRole")]
    AppRole {
        role_id: String,
        #[serde(default)]
        secret_id: Option<String>,
        #[serde(default)]
        mount: Option<String>,
    },

    #[serde(rename = "kubernetes")]
    Kubernetes {
        role: String,
        #[serde(default)]
        jwt_path: Option<String>,
        #[serde(default)]
        mount: Option<String>,
    },
}

impl AuthConfig {
    pub fn token(token: impl Into<String>) -> Self {
        AuthConfig::Token {
            token: token.into(),
        }
    }

    pub fn app_role(role_id: impl Into<String>, secret_id: Option<String>) -> Self {
        AuthConfig::AppRole {
            role_id: role_id.into(),
            secret_id,
            mount: None,
        }
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        match self {
            AuthConfig::Token { token } if token.trim().is_empty() => {
                Err(VaultError::AuthError("token auth requires a token".to_string()))
            }
            AuthConfig::AppRole { role_id, .. } if role_id.trim().is_empty() => {
                Err(VaultError::AuthError("appRole auth requires role_id".to_string()))
            }
            AuthConfig::Kubernetes { role, .. } if role.trim().is_empty() => Err(
                VaultError::AuthError("kubernetes auth requires a role".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Trait for authentication methods
#[async_trait]
pub trait AuthMethod: Send + Sync {
    /// Perform initial authentication
    async fn authenticate(&self, executor: &RequestExecutor) -> Result<TokenInfo, VaultError>;

    /// Produce a fresh token to replace `current`.
    ///
    /// Renewable tokens go through renew-self; a 4xx there, or a token that is not
    /// renewable at all, falls back to a new login.
    async fn renew(
        &self,
        executor: &RequestExecutor,
        current: &TokenInfo,
    ) -> Result<TokenInfo, VaultError> {
        if !current.renewable {
            tracing::info!("Token is not renewable, re-authenticating");
            return self.authenticate(executor).await;
        }

        match renew_self(executor, current).await {
            Err(VaultError::ClientError { status, .. }) if (400..500).contains(&status) => {
                tracing::info!(status, "Token renewal failed with 4xx, re-authenticating");
                self.authenticate(executor).await
            }
            result => result,
        }
    }

    /// Whether tokens from this method can be kept alive; without it no renewal task runs.
    fn supports_renewal(&self) -> bool;
}

/// The closed set of supported backends, selected from [`AuthConfig`].
pub enum AuthStrategy {
    StaticToken(StaticTokenAuth),
    AppRole(AppRoleAuth),
    Kubernetes(KubernetesAuth),
}

impl AuthStrategy {
    pub fn from_config(config: &AuthConfig) -> Result<Self, VaultError> {
        config.validate()?;

        let strategy = match config.clone() {
            AuthConfig::Token { token } => AuthStrategy::StaticToken(StaticTokenAuth::new(token)),
            AuthConfig::AppRole {
                role_id,
                secret_id,
                mount,
            } => {
                let mut auth = AppRoleAuth::new(role_id, secret_id);
                if let Some(mount) = mount {
                    auth = auth.with_mount(mount);
                }
                AuthStrategy::AppRole(auth)
            }
            AuthConfig::Kubernetes {
                role,
                jwt_path,
                mount,
            } => {
                let mut auth = KubernetesAuth::new(
                    mount.unwrap_or_else(|| kubernetes::DEFAULT_MOUNT.to_string()),
                    role,
                );
                if let Some(path) = jwt_path {
                    auth = auth.with_jwt_path(path);
                }
                AuthStrategy::Kubernetes(auth)
            }
        };

        Ok(strategy)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AuthStrategy::StaticToken(_) => "token",
            AuthStrategy::AppRole(_) => "appRole",
            AuthStrategy::Kubernetes(_) => "kubernetes",
        }
    }
}

#[async_trait]
impl AuthMethod for AuthStrategy {
    async fn authenticate(&self, executor: &RequestExecutor) -> Result<TokenInfo, VaultError> {
        match self {
            AuthStrategy::StaticToken(auth) => auth.authenticate(executor).await,
            AuthStrategy::AppRole(auth) => auth.authenticate(executor).await,
            AuthStrategy::Kubernetes(auth) => auth.authenticate(executor).await,
        }
    }

    async fn renew(
        &self,
        executor: &RequestExecutor,
        current: &TokenInfo,
    ) -> Result<TokenInfo, VaultError> {
        match self {
            AuthStrategy::StaticToken(auth) => auth.renew(executor, current).await,
            AuthStrategy::AppRole(auth) => auth.renew(executor, current).await,
            AuthStrategy::Kubernetes(auth) => auth.renew(executor, current).await,
        }
    }

    fn supports_renewal(&self) -> bool {
        match self {
            AuthStrategy::StaticToken(auth) => auth.supports_renewal(),
            AuthStrategy::AppRole(auth) => auth.supports_renewal(),
            AuthStrategy::Kubernetes(auth) => auth.supports_renewal(),
        }
    }
}

pub(crate) fn token_headers(token: &str) -> Result<HeaderMap, VaultError> {
    let value = HeaderValue::from_str(token)
        .map_err(|_| VaultError::AuthError("token is not a valid header value".to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(TOKEN_HEADER, value);
    Ok(headers)
}

/// POST a login body and turn the `auth` block of the reply into a token.
pub(crate) async fn login(
    executor: &RequestExecutor,
    path: &str,
    body: &serde_json::Value,
) -> Result<TokenInfo, VaultError> {
    let response = executor
        .execute(Method::POST, path, Some(body), None)
        .await
        .map_err(|e| match e {
            VaultError::ClientError {
                status, message, ..
            } => VaultError::AuthRejected { status, message },
            other => other,
        })?;

    let auth = response
        .auth()
        .ok_or_else(|| VaultError::AuthError(format!("no auth info in {} response", path)))?;

    tracing::debug!(
        path,
        policies = ?auth.policies,
        lease_secs = auth.lease_duration,
        renewable = auth.renewable,
        "Authenticated"
    );

    Ok(TokenInfo::new(
        auth.client_token,
        Duration::from_secs(auth.lease_duration),
        auth.renewable,
    ))
}

async fn renew_self(
    executor: &RequestExecutor,
    current: &TokenInfo,
) -> Result<TokenInfo, VaultError> {
    let headers = token_headers(&current.token)?;
    let response = executor
        .execute(
            Method::POST,
            RENEW_SELF_PATH,
            Some(&serde_json::json!({})),
            Some(headers),
        )
        .await?;

    let auth = response
        .auth()
        .ok_or_else(|| VaultError::AuthError("Invalid renewal response: no auth info".to_string()))?;

    Ok(TokenInfo::new(
        auth.client_token,
        Duration::from_secs(auth.lease_duration),
        auth.renewable,
    ))
}
