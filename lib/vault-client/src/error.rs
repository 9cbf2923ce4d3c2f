use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault not detected: VAULT_ADDR not set")]
    VaultNotDetected,

    #[error("Invalid Vault URL: {0}")]
    InvalidUrl(String),

    #[error("Vault client error ({status}): {message}")]
    ClientError {
        status: u16,
        message: String,
        response_data: Option<serde_json::Value>,
    },

    #[error("Vault request error: {0}")]
    RequestError(String),

    #[error("Vault request timed out: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Authentication rejected ({status}): {message}")]
    AuthRejected { status: u16, message: String },

    #[error("Kubernetes auth failed: {0}")]
    KubernetesError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    /// HTTP status of the terminal response, `None` for transport-level failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            VaultError::ClientError { status, .. } | VaultError::AuthRejected { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VaultError::Timeout(_))
    }

    /// True for failures that never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, VaultError::RequestError(_) | VaultError::Timeout(_))
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            VaultError::Timeout(err.to_string())
        } else {
            VaultError::RequestError(err.to_string())
        }
    }
}
