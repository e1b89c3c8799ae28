use std::time::Duration;

use tokio::time::{sleep_until, Instant};

/// Enforces a minimum interval between consecutive requests to one provider.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last: None,
        }
    }

    /// Returns immediately on first use, otherwise once `interval` has passed
    /// since the previous call returned.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            sleep_until(last + self.interval).await;
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn spaces_consecutive_calls() {
        let mut throttle = Throttle::new(Duration::from_secs(6));
        let start = Instant::now();

        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_millis(1));

        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(6));

        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn no_wait_when_interval_already_passed() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        throttle.wait().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let before = Instant::now();
        throttle.wait().await;
        assert!(before.elapsed() < Duration::from_millis(1));
    }
}
