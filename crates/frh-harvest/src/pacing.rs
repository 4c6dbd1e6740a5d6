//! Randomized delays between page interactions.
//!
//! Municipal registries are small shared systems. A short, jittered
//! pause before every click keeps the harvester from hammering them
//! and makes the traffic pattern less bursty.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    min_ms: u64,
    max_ms: u64,
}

impl Pacing {
    /// Builds a pacer that pauses between `min_ms` and `max_ms`
    /// milliseconds. Swapped bounds are reordered.
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }

    /// A pacer that never sleeps, for tests and dry runs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
        }
    }

    /// Sleeps for a uniformly random duration within the configured
    /// bounds.
    pub async fn pause(&self) {
        if self.max_ms == 0 {
            return;
        }
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorders_swapped_bounds() {
        let pacing = Pacing::new(500, 100);
        assert_eq!(pacing.min_ms, 100);
        assert_eq!(pacing.max_ms, 500);
    }

    #[tokio::test]
    async fn disabled_pacer_returns_immediately() {
        let start = std::time::Instant::now();
        Pacing::disabled().pause().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
