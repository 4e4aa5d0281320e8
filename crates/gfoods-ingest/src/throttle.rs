//! Fixed-interval request throttle
//!
//! Each source client owns one [`Throttle`] and sends every outbound request
//! through [`Throttle::run`]. The interval is measured from the moment the
//! previous response finished, so a slow response never shortens the pause.
//! There is no backoff: the interval is the whole admission-control mechanism.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    finished: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            finished: Mutex::new(None),
        }
    }

    /// A throttle that never sleeps
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait out the interval since the previous request finished, then drive
    /// `request` to completion
    pub async fn run<F: Future>(&self, request: F) -> F::Output {
        let mut finished = self.finished.lock().await;
        if let Some(previous) = *finished {
            sleep_until(previous + self.interval).await;
        }
        let output = request.await;
        *finished = Some(Instant::now());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_sleep() {
        let throttle = Throttle::new(Duration::from_millis(340));
        let start = Instant::now();
        throttle.run(async {}).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_calls_are_spaced() {
        let throttle = Throttle::new(Duration::from_millis(340));
        let start = Instant::now();
        for _ in 0..4 {
            throttle.run(async {}).await;
        }
        assert!(start.elapsed() >= Duration::from_millis(3 * 340));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_interval_follows_slow_response() {
        let throttle = Throttle::new(Duration::from_millis(340));
        throttle.run(sleep(Duration::from_millis(500))).await;

        let before = Instant::now();
        throttle.run(async {}).await;
        assert!(before.elapsed() >= Duration::from_millis(340));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_request_output() {
        let throttle = Throttle::new(Duration::from_millis(150));
        assert_eq!(throttle.run(async { 7 }).await, 7);
    }

    #[tokio::test]
    async fn test_disabled_throttle() {
        let throttle = Throttle::disabled();
        assert_eq!(throttle.interval(), Duration::ZERO);
        throttle.run(async {}).await;
        throttle.run(async {}).await;
    }
}
