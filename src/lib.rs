//! vault-settings - fill application configuration with secrets from Vault.
//!
//! A configuration tree (`serde_json::Value`) may contain secret-reference markers:
//!
//! ```json
//! {
//!   "db": {
//!     "user": "app",
//!     "password": {"ref": "kv-v1/db", "key": "password"},
//!     "token": {"$secret": "kv-v1/api:token"}
//!   }
//! }
//! ```
//!
//! [`fill_node_config`] reads each referenced secret through a [`VaultClient`] and
//! overwrites the markers in place.

mod error;
pub mod secrets;

pub use error::ConfigInjectionError;
pub use secrets::{fill_node_config, FillNodeConfig, SecretRef};
pub use vault_client::{AuthConfig, ClientConfig, VaultClient, VaultClientBuilder, VaultError};
