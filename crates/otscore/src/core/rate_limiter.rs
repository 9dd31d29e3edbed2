use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::registration::types::ApplicantId;

/// Fixed-window rate limiter per applicant.
///
/// Every applicant may send `max_events` events per `window`. The window starts
/// with the first event after the previous one expired.
#[derive(Clone)]
pub struct RateLimiter {
    /// Window start and events counted in it, per applicant
    windows: Arc<Mutex<HashMap<ApplicantId, (Instant, u32)>>>,
    max_events: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_events: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_events,
            window,
        }
    }

    /// Counts one event. Returns `false` when the applicant is over the limit.
    pub async fn check(&self, id: ApplicantId) -> bool {
        self.check_at(id, Instant::now()).await
    }

    pub async fn check_at(&self, id: ApplicantId, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(id).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        if entry.1 >= self.max_events {
            return false;
        }
        entry.1 += 1;
        true
    }

    /// Drops windows that have expired.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, (start, _)| now.duration_since(*start) < self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limit_within_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let id = ApplicantId(1);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(limiter.check_at(id, t0).await);
        }
        assert!(!limiter.check_at(id, t0 + Duration::from_secs(59)).await);
        // Another applicant is unaffected.
        assert!(limiter.check_at(ApplicantId(2), t0).await);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let id = ApplicantId(1);
        let t0 = Instant::now();
        assert!(limiter.check_at(id, t0).await);
        assert!(!limiter.check_at(id, t0 + Duration::from_secs(30)).await);
        assert!(limiter.check_at(id, t0 + Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_live_windows() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check(ApplicantId(1)).await;
        limiter.cleanup().await;
        assert!(!limiter.check(ApplicantId(1)).await);
    }
}
