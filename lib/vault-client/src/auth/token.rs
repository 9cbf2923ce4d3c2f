use super::{AuthMethod, TokenInfo};
use crate::request::RequestExecutor;
use crate::VaultError;
use async_trait::async_trait;

/// Static token authentication
pub struct StaticTokenAuth {
    token: String,
}

impl StaticTokenAuth {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AuthMethod for StaticTokenAuth {
    async fn authenticate(&self, _executor: &RequestExecutor) -> Result<TokenInfo, VaultError> {
        Ok(TokenInfo::static_token(self.token.clone()))
    }

    async fn renew(
        &self,
        _executor: &RequestExecutor,
        _current: &TokenInfo,
    ) -> Result<TokenInfo, VaultError> {
        Err(VaultError::AuthError(
            "static token auth does not support renewal".to_string(),
        ))
    }

    fn supports_renewal(&self) -> bool {
        false
    }
}
