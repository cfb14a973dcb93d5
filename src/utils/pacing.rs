//! Human-pacing delays
//!
//! Every randomized wait in the flow is a single uniform draw over an
//! inclusive integer millisecond window; there is no back-off and no
//! additional jitter.

use rand::Rng;
use std::time::Duration;

/// Draw one delay from the inclusive `[min_ms, max_ms]` window
///
/// A degenerate window (`min >= max`) collapses to `min_ms`.
pub fn sample_delay_ms(min_ms: u64, max_ms: u64) -> u64 {
    if min_ms >= max_ms {
        return min_ms;
    }
    rand::rng().random_range(min_ms..=max_ms)
}

/// Sleep for one sampled delay
pub async fn human_delay(min_ms: u64, max_ms: u64) {
    tokio::time::sleep(Duration::from_millis(sample_delay_ms(min_ms, max_ms))).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_within_inclusive_bounds() {
        for _ in 0..1000 {
            let delay = sample_delay_ms(1000, 2000);
            assert!((1000..=2000).contains(&delay), "out of range: {delay}");
        }
    }

    #[test]
    fn degenerate_window_collapses_to_min() {
        assert_eq!(sample_delay_ms(500, 500), 500);
        assert_eq!(sample_delay_ms(800, 300), 800);
    }
}
