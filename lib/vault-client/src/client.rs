use crate::auth::{
    token_headers, AuthConfig, AuthMethod, AuthStrategy, TokenInfo, TokenManager,
    TokenManagerConfig,
};
use crate::config::ClientConfig;
use crate::error::VaultError;
use crate::models::Response;
use crate::request::{RequestExecutor, RequestOptions, DEFAULT_API_VERSION};
use crate::transport::Transport;
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_K8S_ROLE: &str = "app";

pub struct VaultClientBuilder {
    base_url: Option<String>,
    api_version: Option<String>,
    auth: Option<AuthConfig>,
    token: Option<String>,
    role_id: Option<String>,
    secret_id: Option<String>,
    application_name: Option<String>,
    request_options: RequestOptions,
    token_manager_config: TokenManagerConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for VaultClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_version: None,
            auth: None,
            token: None,
            role_id: None,
            secret_id: None,
            application_name: None,
            request_options: RequestOptions::default(),
            token_manager_config: TokenManagerConfig::default(),
            transport: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn app_role(mut self, role_id: impl Into<String>, secret_id: Option<String>) -> Self {
        self.role_id = Some(role_id.into());
        self.secret_id = secret_id;
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn request_options(mut self, options: RequestOptions) -> Self {
        self.request_options = options;
        self
    }

    pub fn refresh_threshold(mut self, threshold: f64) -> Self {
        self.token_manager_config.refresh_threshold = threshold;
        self
    }

    pub fn retry_interval(mut self, duration: Duration) -> Self {
        self.token_manager_config.retry_interval = duration;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    fn resolve_config(&self) -> Result<ResolvedConfig, VaultError> {
        let base_url = self
            .base_url
            .clone()
            .or_else(|| std::env::var("VAULT_ADDR").ok())
            .ok_or(VaultError::VaultNotDetected)?;

        let api_version = self
            .api_version
            .clone()
            .or_else(|| std::env::var("VAULT_API_VERSION").ok())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let auth = match self.auth.clone() {
            Some(auth) => auth,
            None => self.auth_from_env()?,
        };

        Ok(ResolvedConfig {
            base_url,
            api_version,
            auth,
        })
    }

    fn auth_from_env(&self) -> Result<AuthConfig, VaultError> {
        if let Some(token) = self
            .token
            .clone()
            .or_else(|| std::env::var("VAULT_TOKEN").ok())
        {
            return Ok(AuthConfig::token(token));
        }

        if let Some(role_id) = self
            .role_id
            .clone()
            .or_else(|| std::env::var("VAULT_ROLE_ID").ok())
        {
            let secret_id = self
                .secret_id
                .clone()
                .or_else(|| std::env::var("VAULT_SECRET_ID").ok());
            return Ok(AuthConfig::app_role(role_id, secret_id));
        }

        if std::env::var("KUBERNETES_SERVICE_HOST").is_ok() {
            return Ok(AuthConfig::Kubernetes {
                role: std::env::var("VAULT_K8S_ROLE").unwrap_or_else(|_| DEFAULT_K8S_ROLE.to_string()),
                jwt_path: std::env::var("K8S_JWT_TOKEN_PATH").ok(),
                mount: std::env::var("VAULT_AUTH_METHOD").ok(),
            });
        }

        Err(VaultError::AuthError(
            "no authentication configured: set a token, an AppRole or VAULT_TOKEN".to_string(),
        ))
    }

    pub async fn build(self) -> Result<VaultClient, VaultError> {
        let config = self.resolve_config()?;

        // Reject bad credentials before touching the network
        let strategy = AuthStrategy::from_config(&config.auth)?;
        let auth_name = strategy.name();

        let mut options = self.request_options;
        if let Some(app_name) = self.application_name {
            options.headers.insert("user-agent".to_string(), app_name);
        }

        let executor = match self.transport {
            Some(transport) => RequestExecutor::with_transport(
                &config.base_url,
                &config.api_version,
                &options,
                transport,
            )?,
            None => RequestExecutor::new(&config.base_url, &config.api_version, &options)?,
        };
        let executor = Arc::new(executor);

        let auth_method: Arc<dyn AuthMethod> = Arc::new(strategy);
        let token_manager = TokenManager::new(
            Arc::clone(&executor),
            auth_method,
            self.token_manager_config,
        )
        .await?;

        tracing::info!(url = %config.base_url, auth = auth_name, "Vault client authenticated");

        Ok(VaultClient {
            executor,
            token_manager,
        })
    }
}

struct ResolvedConfig {
    base_url: String,
    api_version: String,
    auth: AuthConfig,
}

pub struct VaultClient {
    executor: Arc<RequestExecutor>,
    token_manager: TokenManager,
}

impl VaultClient {
    pub async fn from_env() -> Result<Self, VaultError> {
        VaultClientBuilder::new().build().await
    }

    pub async fn from_config(config: ClientConfig) -> Result<Self, VaultError> {
        let mut builder = VaultClientBuilder::new()
            .base_url(config.api.url)
            .auth(config.auth)
            .request_options(config.api.request_options);
        if let Some(version) = config.api.api_version {
            builder = builder.api_version(version);
        }
        builder.build().await
    }

    pub fn builder() -> VaultClientBuilder {
        VaultClientBuilder::new()
    }

    pub async fn read(&self, path: &str) -> Result<Response, VaultError> {
        self.request(Method::GET, &normalize_path(path), &[], None).await
    }

    pub async fn write<T>(&self, path: &str, data: &T) -> Result<Response, VaultError>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_value(data)?;
        self.request(Method::POST, &normalize_path(path), &[], Some(&body))
            .await
    }

    /// Enumerate the keys under `path`; the payload is `{"keys": [...]}`.
    pub async fn list(&self, path: &str) -> Result<Response, VaultError> {
        self.request(Method::GET, &normalize_path(path), &[("list", "true")], None)
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<Response, VaultError> {
        self.request(Method::DELETE, &normalize_path(path), &[], None)
            .await
    }

    /// Snapshot of the token currently used for requests.
    pub fn token_info(&self) -> Arc<TokenInfo> {
        self.token_manager.current()
    }

    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }

    /// Stop background token renewal. Requests keep using the last token.
    pub fn shutdown(&self) {
        self.token_manager.shutdown();
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<Response, VaultError> {
        let token = self.token_manager.current();
        let headers = token_headers(&token.token)?;
        self.executor
            .execute_with_query(method, path, query, body, Some(headers))
            .await
    }
}

fn normalize_path(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}
