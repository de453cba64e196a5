use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Randomised pauses between attempts. Swappable so tests run without timers.
#[async_trait]
pub trait DelayScheduler: Send + Sync {
    async fn wait(&self, min_ms: u64, max_ms: u64);
}

/// Uniform pick in `[min_ms, max_ms]`; bounds are swapped if reversed.
pub fn pick_delay(min_ms: u64, max_ms: u64) -> Duration {
    let (lo, hi) = if min_ms <= max_ms { (min_ms, max_ms) } else { (max_ms, min_ms) };
    Duration::from_millis(rand::rng().random_range(lo..=hi))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDelay;

#[async_trait]
impl DelayScheduler for RandomDelay {
    async fn wait(&self, min_ms: u64, max_ms: u64) {
        sleep(pick_delay(min_ms, max_ms)).await;
    }
}

/// Returns immediately.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[cfg(test)]
#[async_trait]
impl DelayScheduler for NoDelay {
    async fn wait(&self, _min_ms: u64, _max_ms: u64) {}
}
