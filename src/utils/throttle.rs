//! Fixed courtesy delay for rate-limited upstream services.
//!
//! arXiv asks clients to wait three seconds between consecutive calls to the
//! search API and the OAI endpoint. [`Throttle::wait`] is awaited before every
//! such request; there is no token bucket and no burst allowance.

use std::time::Duration;

/// Sleeps a fixed delay before each rate-limited request
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// A throttle that never sleeps
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the configured delay
    pub async fn wait(&self) {
        if self.delay.is_zero() {
            return;
        }
        tracing::debug!("Sleeping {:?} before next request", self.delay);
        tokio::time::sleep(self.delay).await;
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::from_millis(3000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_delay_is_three_seconds() {
        assert_eq!(Throttle::default().delay(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_wait_sleeps_configured_delay() {
        let throttle = Throttle::from_millis(50);
        let started = std::time::Instant::now();
        throttle.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_none_returns_immediately() {
        let started = std::time::Instant::now();
        Throttle::none().wait().await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
