use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LockError, Result};

/// Timing for [`DistributedLock`](crate::DistributedLock).
///
/// Durations are serialized as milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lease lifetime; renewed every third of it while held.
    #[serde(with = "arca_types::duration_ms")]
    pub lease_ttl: Duration,
    /// How long one acquisition attempt waits for the current holder.
    #[serde(with = "arca_types::duration_ms")]
    pub attempt_timeout: Duration,
    /// First retry delay; doubles per failed attempt.
    #[serde(with = "arca_types::duration_ms")]
    pub initial_backoff: Duration,
    /// Ceiling on the retry delay.
    #[serde(with = "arca_types::duration_ms")]
    pub max_backoff: Duration,
    /// Give up after this many attempts. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_ttl: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl LockConfig {
    pub fn validate(&self) -> Result<()> {
        if self.lease_ttl.is_zero() {
            return Err(LockError::InvalidConfig("lease_ttl must be positive".into()));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(LockError::InvalidConfig(
                "initial_backoff exceeds max_backoff".into(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(LockError::InvalidConfig("max_attempts must be positive".into()));
        }
        Ok(())
    }

    /// Renewal period for a held lease.
    pub fn renew_interval(&self) -> Duration {
        (self.lease_ttl / 3).max(Duration::from_millis(1))
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = LockConfig::default();
        assert_eq!(c.lease_ttl, Duration::from_secs(30));
        assert_eq!(c.attempt_timeout, Duration::from_secs(5));
        assert_eq!(c.max_backoff, Duration::from_secs(2));
        assert_eq!(c.max_attempts, None);
        assert_eq!(c.renew_interval(), Duration::from_secs(10));
        c.validate().unwrap();
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let c = LockConfig::default();
        assert_eq!(c.backoff(1), Duration::from_millis(10));
        assert_eq!(c.backoff(2), Duration::from_millis(20));
        assert_eq!(c.backoff(5), Duration::from_millis(160));
        assert_eq!(c.backoff(20), Duration::from_secs(2));
        assert_eq!(c.backoff(200), Duration::from_secs(2));
    }

    #[test]
    fn zero_attempts_rejected() {
        let c = LockConfig {
            max_attempts: Some(0),
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(LockError::InvalidConfig(_))));
    }

    #[test]
    fn parses_partial_json() {
        let c: LockConfig =
            serde_json::from_str(r#"{"lease_ttl": 900, "max_attempts": 3}"#).unwrap();
        assert_eq!(c.lease_ttl, Duration::from_millis(900));
        assert_eq!(c.max_attempts, Some(3));
        assert_eq!(c.max_backoff, Duration::from_secs(2));
    }
}
