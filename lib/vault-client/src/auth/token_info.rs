use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Token information from authentication
#[derive(Clone)]
pub struct TokenInfo {
    pub token: String,
    pub lease_duration: Duration,
    pub renewable: bool,
    pub issued_at: DateTime<Utc>,
    pub obtained_at: Instant,
}

impl TokenInfo {
    pub fn new(token: String, lease_duration: Duration, renewable: bool) -> Self {
        Self {
            token,
            lease_duration,
            renewable,
            issued_at: Utc::now(),
            obtained_at: Instant::now(),
        }
    }

    /// Static token (never expires)
    pub fn static_token(token: String) -> Self {
        Self::new(token, Duration::ZERO, false)
    }

    pub fn is_expiring(&self) -> bool {
        !self.lease_duration.is_zero()
    }

    /// Time left until the refresh point, `None` for tokens without a lease.
    pub fn refresh_delay(&self, threshold: f64) -> Option<Duration> {
        if !self.is_expiring() {
            return None;
        }
        let threshold_duration =
            Duration::from_secs_f64(self.lease_duration.as_secs_f64() * threshold);
        Some(threshold_duration.saturating_sub(self.obtained_at.elapsed()))
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        if !self.is_expiring() {
            return false;
        }
        self.obtained_at.elapsed() >= self.lease_duration
    }
}

impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("token", &"<redacted>")
            .field("lease_duration", &self.lease_duration)
            .field("renewable", &self.renewable)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_never_expires() {
        let token = TokenInfo::static_token("test".to_string());
        assert!(!token.is_expired());
        assert!(token.refresh_delay(0.5).is_none());
    }

    #[test]
    fn test_refresh_delay_after_threshold_is_zero() {
        let mut token = TokenInfo::new("test".to_string(), Duration::from_secs(100), true);
        // Simulate time passing
        token.obtained_at = Instant::now() - Duration::from_secs(60);
        assert_eq!(token.refresh_delay(0.5), Some(Duration::ZERO));
        assert!(token.refresh_delay(0.75).is_some_and(|delay| delay > Duration::ZERO));
    }

    #[test]
    fn test_refresh_delay_is_half_lease_for_fresh_token() {
        let token = TokenInfo::new("test".to_string(), Duration::from_secs(100), true);
        let delay = token.refresh_delay(0.5).unwrap();
        assert!(delay <= Duration::from_secs(50));
        assert!(delay > Duration::from_secs(49));
    }

    #[test]
    fn test_token_not_expired_before_lease() {
        let mut token = TokenInfo::new("test".to_string(), Duration::from_secs(100), true);
        token.obtained_at = Instant::now() - Duration::from_secs(50);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_debug_hides_token() {
        let token = TokenInfo::new("s.very-secret".to_string(), Duration::from_secs(10), true);
        let rendered = format!("{:?}", token);
        assert!(!rendered.contains("very-secret"));
    }
}
