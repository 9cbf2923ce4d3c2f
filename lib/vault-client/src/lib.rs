//! vault-client - Rust client for HashiCorp Vault
//!
//! Authentication is selected from [`AuthConfig`] (or the environment):
//! 1. static token (`VAULT_TOKEN`)
//! 2. AppRole (`VAULT_ROLE_ID` / `VAULT_SECRET_ID`)
//! 3. Kubernetes service account (`KUBERNETES_SERVICE_HOST`)
//!
//! After the first login a background task keeps the token alive until the
//! client is shut down or dropped.

pub mod auth;
mod client;
mod config;
mod error;
mod models;
pub mod request;
pub mod transport;

pub use auth::{AuthConfig, AuthMethod, AuthStrategy, TokenInfo};
pub use client::{VaultClient, VaultClientBuilder};
pub use config::{ApiConfig, ClientConfig};
pub use error::VaultError;
pub use models::{AuthData, Response};
pub use request::{RequestExecutor, RequestOptions};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
