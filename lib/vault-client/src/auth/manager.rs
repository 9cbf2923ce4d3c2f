use super::{AuthMethod, TokenInfo};
use crate::request::RequestExecutor;
use crate::VaultError;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_REFRESH_THRESHOLD: f64 = 0.5;
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TokenManagerConfig {
    /// Fraction of the lease after which the token is renewed.
    pub refresh_threshold: f64,
    /// Pause before retrying a failed renewal.
    pub retry_interval: Duration,
}

impl TokenManagerConfig {
    /// The threshold must be a fraction of the lease in `(0, 1]`.
    pub fn validate(&self) -> Result<(), VaultError> {
        let threshold = self.refresh_threshold;
        if !(threshold.is_finite() && threshold > 0.0 && threshold <= 1.0) {
            return Err(VaultError::AuthError(format!(
                "refresh threshold must be within (0, 1], got {}",
                threshold
            )));
        }
        Ok(())
    }
}

impl Default for TokenManagerConfig {
    fn default() -> Self {
        Self {
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Owns the current token and the background task that keeps it alive.
///
/// The token is published through an [`ArcSwap`]: the renewal task is the only
/// writer and every reader gets a complete snapshot.
pub struct TokenManager {
    token: Arc<ArcSwap<TokenInfo>>,
    cancel: CancellationToken,
}

impl TokenManager {
    /// Authenticate once and start the renewal task.
    pub async fn new(
        executor: Arc<RequestExecutor>,
        auth_method: Arc<dyn AuthMethod>,
        config: TokenManagerConfig,
    ) -> Result<Self, VaultError> {
        config.validate()?;

        let token_info = auth_method
            .authenticate(&executor)
            .await
            .map_err(into_auth_error)?;

        let manager = Self {
            token: Arc::new(ArcSwap::from_pointee(token_info)),
            cancel: CancellationToken::new(),
        };

        if auth_method.supports_renewal() {
            manager.start_renewal_task(executor, auth_method, config);
        } else {
            tracing::debug!("Auth method cannot renew tokens, renewal task not started");
        }

        Ok(manager)
    }

    /// Snapshot of the current token.
    pub fn current(&self) -> Arc<TokenInfo> {
        self.token.load_full()
    }

    pub fn get_token(&self) -> String {
        self.token.load().token.clone()
    }

    /// Stop future renewals. A renewal already in flight is allowed to finish.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn start_renewal_task(
        &self,
        executor: Arc<RequestExecutor>,
        auth_method: Arc<dyn AuthMethod>,
        config: TokenManagerConfig,
    ) {
        let token = Arc::clone(&self.token);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                let current = token.load_full();

                let Some(sleep_duration) = current.refresh_delay(config.refresh_threshold) else {
                    // Token without a lease, never refresh
                    tracing::debug!("Token does not expire, renewal task idle");
                    break;
                };

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(sleep_duration) => {}
                }

                match auth_method.renew(&executor, &current).await {
                    Ok(renewed) => {
                        tracing::debug!(
                            lease_secs = renewed.lease_duration.as_secs(),
                            renewable = renewed.renewable,
                            "Token renewed successfully"
                        );
                        token.store(Arc::new(renewed));
                    }
                    Err(e) if current.is_expired() => {
                        tracing::error!(
                            "Token expired and renewal failed: {}, retrying in {:?}",
                            e,
                            config.retry_interval
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(config.retry_interval) => {}
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Token renewal failed: {}, retrying in {:?}",
                            e,
                            config.retry_interval
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(config.retry_interval) => {}
                        }
                    }
                }
            }

            tracing::debug!("Token renewal task stopped");
        });
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn into_auth_error(err: VaultError) -> VaultError {
    match err {
        VaultError::AuthError(_) | VaultError::AuthRejected { .. } => err,
        other => VaultError::AuthError(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenAuth;
    use crate::request::RequestOptions;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Issues `token-N` tokens; fails the renewals listed in `failing`.
    struct CountingAuth {
        lease: Duration,
        renewals: AtomicUsize,
        failing: Vec<usize>,
    }

    impl CountingAuth {
        fn new(lease: Duration) -> Self {
            Self {
                lease,
                renewals: AtomicUsize::new(0),
                failing: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl AuthMethod for CountingAuth {
        async fn authenticate(&self, _executor: &RequestExecutor) -> Result<TokenInfo, VaultError> {
            Ok(TokenInfo::new("token-0".to_string(), self.lease, true))
        }

        async fn renew(
            &self,
            _executor: &RequestExecutor,
            _current: &TokenInfo,
        ) -> Result<TokenInfo, VaultError> {
            let attempt = self.renewals.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.contains(&attempt) {
                return Err(VaultError::RequestError("connection refused".to_string()));
            }
            Ok(TokenInfo::new(format!("token-{}", attempt), self.lease, true))
        }

        fn supports_renewal(&self) -> bool {
            true
        }
    }

    struct FailingAuth;

    #[async_trait]
    impl AuthMethod for FailingAuth {
        async fn authenticate(&self, _executor: &RequestExecutor) -> Result<TokenInfo, VaultError> {
            Err(VaultError::RequestError("connection refused".to_string()))
        }

        fn supports_renewal(&self) -> bool {
            true
        }
    }

    fn executor() -> Arc<RequestExecutor> {
        Arc::new(
            RequestExecutor::new("http://vault:8200", "v1", &RequestOptions::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_token_manager_with_static_token() {
        let auth = Arc::new(StaticTokenAuth::new("my-token".to_string()));
        let manager = TokenManager::new(executor(), auth, TokenManagerConfig::default())
            .await
            .unwrap();

        assert_eq!(manager.get_token(), "my-token");
        assert!(manager.current().lease_duration.is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_renews_at_half_lease() {
        let auth = Arc::new(CountingAuth::new(Duration::from_secs(2)));
        let manager = TokenManager::new(
            executor(),
            Arc::clone(&auth) as Arc<dyn AuthMethod>,
            TokenManagerConfig::default(),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(manager.get_token(), "token-0");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(manager.get_token(), "token-1");

        // 2.5s after login the original lease would be gone; the token is two renewals in.
        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(manager.get_token(), "token-2");
        assert!(!manager.current().is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_renewal_is_retried() {
        let auth = Arc::new(CountingAuth {
            failing: vec![1],
            ..CountingAuth::new(Duration::from_secs(10))
        });
        let config = TokenManagerConfig {
            refresh_threshold: 0.5,
            retry_interval: Duration::from_secs(1),
        };
        let manager = TokenManager::new(executor(), Arc::clone(&auth) as Arc<dyn AuthMethod>, config)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(auth.renewals.load(Ordering::SeqCst), 1);
        assert_eq!(manager.get_token(), "token-0");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(auth.renewals.load(Ordering::SeqCst), 2);
        assert_eq!(manager.get_token(), "token-2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_renewals() {
        let auth = Arc::new(CountingAuth::new(Duration::from_secs(2)));
        let manager = TokenManager::new(
            executor(),
            Arc::clone(&auth) as Arc<dyn AuthMethod>,
            TokenManagerConfig::default(),
        )
        .await
        .unwrap();

        manager.shutdown();
        assert!(manager.is_shut_down());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(auth.renewals.load(Ordering::SeqCst), 0);
        assert_eq!(manager.get_token(), "token-0");
    }

    /// Leased tokens, but the method has no way to refresh them.
    struct OneShotAuth {
        renewals: AtomicUsize,
    }

    #[async_trait]
    impl AuthMethod for OneShotAuth {
        async fn authenticate(&self, _executor: &RequestExecutor) -> Result<TokenInfo, VaultError> {
            Ok(TokenInfo::new("once".to_string(), Duration::from_secs(2), true))
        }

        async fn renew(
            &self,
            _executor: &RequestExecutor,
            current: &TokenInfo,
        ) -> Result<TokenInfo, VaultError> {
            self.renewals.fetch_add(1, Ordering::SeqCst);
            Ok(current.clone())
        }

        fn supports_renewal(&self) -> bool {
            false
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_renewal_task_without_renewal_support() {
        let auth = Arc::new(OneShotAuth {
            renewals: AtomicUsize::new(0),
        });
        let manager = TokenManager::new(
            executor(),
            Arc::clone(&auth) as Arc<dyn AuthMethod>,
            TokenManagerConfig::default(),
        )
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(auth.renewals.load(Ordering::SeqCst), 0);
        assert_eq!(manager.get_token(), "once");
    }

    #[test]
    fn test_config_rejects_out_of_range_threshold() {
        for threshold in [-0.5, 0.0, 1.5, f64::NAN, f64::INFINITY] {
            let config = TokenManagerConfig {
                refresh_threshold: threshold,
                ..TokenManagerConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(VaultError::AuthError(_))),
                "{} accepted",
                threshold
            );
        }
        assert!(TokenManagerConfig::default().validate().is_ok());
        let full_lease = TokenManagerConfig {
            refresh_threshold: 1.0,
            ..TokenManagerConfig::default()
        };
        assert!(full_lease.validate().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_threshold_fails_before_login() {
        let auth = Arc::new(CountingAuth::new(Duration::from_secs(2)));
        let config = TokenManagerConfig {
            refresh_threshold: -0.5,
            ..TokenManagerConfig::default()
        };
        let result =
            TokenManager::new(executor(), Arc::clone(&auth) as Arc<dyn AuthMethod>, config).await;
        assert!(matches!(result, Err(VaultError::AuthError(_))));
    }

    #[tokio::test]
    async fn test_initial_auth_failure_is_auth_error() {
        let result =
            TokenManager::new(executor(), Arc::new(FailingAuth), TokenManagerConfig::default())
                .await;
        assert!(matches!(result, Err(VaultError::AuthError(_))));
    }
}
