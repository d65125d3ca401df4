//! Process-wide inter-request gap enforcement for the broker REST API.
//! The broker enforces a per-second request cap far stricter than typical
//! REST APIs; every call site shares this mutex so a burst of concurrent
//! tasks doesn't trip the broker's own throttle.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval: Duration::from_millis(min_interval_ms),
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Block until at least `min_interval` has elapsed since the last
    /// permitted request, then record this call as the new last request.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Whether a broker error body signals the business-level throttle code
/// (`EGW00201`) or its Korean-language description, distinct from a plain
/// HTTP 429/500. Both are treated as retryable with the same backoff.
pub fn is_rate_limit_error(body: &str) -> bool {
    body.contains("EGW00201") || body.contains("초당 거래건수를 초과")
}

/// Backoff delay for the `attempt`'th retry (1-indexed): `1.2 * attempt`
/// seconds, matching the broker's documented guidance for EGW00201 retries.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis((1200.0 * attempt as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_business_rate_limit_code() {
        assert!(is_rate_limit_error(r#"{"msg_cd":"EGW00201"}"#));
        assert!(!is_rate_limit_error(r#"{"msg_cd":"0"}"#));
    }

    #[test]
    fn backoff_scales_linearly_with_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1200));
        assert_eq!(backoff_delay(2), Duration::from_millis(2400));
    }
}
