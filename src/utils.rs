use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A randomized delay range in milliseconds.
///
/// Random pacing is part of the evasion strategy, not noise: requests that
/// arrive on a perfectly regular clock are easy to fingerprint. Tests can
/// inject [`JitterRange::zero`] to run without sleeping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct JitterRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl JitterRange {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A no-delay policy for tests.
    pub fn zero() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    /// Picks a uniformly random duration within the range.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(fastrand::u64(self.min_ms..=self.max_ms))
    }

    /// Sleeps for a random duration within the range.
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Delay schedule for one run. All values are deliberate pacing, tuned
/// against the target site's bot defenses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Dwell after the initial page load.
    #[serde(default = "default_initial_dwell")]
    pub initial_dwell: JitterRange,

    /// Pause between scroll steps while triggering lazy loads.
    #[serde(default = "default_scroll_pause")]
    pub scroll_pause: JitterRange,

    /// Pause between individual item extractions.
    #[serde(default = "default_item_pause")]
    pub item_pause: JitterRange,

    /// Pause after clicking through to the next page.
    #[serde(default = "default_navigation_pause")]
    pub navigation_pause: JitterRange,

    /// Fixed pause after dispatching an alert.
    #[serde(default = "default_post_alert_pause_ms")]
    pub post_alert_pause_ms: u64,

    /// Cooldown while waiting out a browser-check interstitial.
    #[serde(default = "default_interstitial_cooldown_ms")]
    pub interstitial_cooldown_ms: u64,

    /// Settle time after submitting a challenge solution.
    #[serde(default = "default_challenge_settle_ms")]
    pub challenge_settle_ms: u64,
}

fn default_initial_dwell() -> JitterRange {
    JitterRange::new(3500, 6500)
}

fn default_scroll_pause() -> JitterRange {
    JitterRange::new(800, 1500)
}

fn default_item_pause() -> JitterRange {
    JitterRange::new(100, 400)
}

fn default_navigation_pause() -> JitterRange {
    JitterRange::new(3000, 5000)
}

fn default_post_alert_pause_ms() -> u64 {
    1000
}

fn default_interstitial_cooldown_ms() -> u64 {
    15_000
}

fn default_challenge_settle_ms() -> u64 {
    12_000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            initial_dwell: default_initial_dwell(),
            scroll_pause: default_scroll_pause(),
            item_pause: default_item_pause(),
            navigation_pause: default_navigation_pause(),
            post_alert_pause_ms: default_post_alert_pause_ms(),
            interstitial_cooldown_ms: default_interstitial_cooldown_ms(),
            challenge_settle_ms: default_challenge_settle_ms(),
        }
    }
}

impl PacingConfig {
    /// All delays collapsed to zero, for deterministic tests.
    pub fn zeroed() -> Self {
        Self {
            initial_dwell: JitterRange::zero(),
            scroll_pause: JitterRange::zero(),
            item_pause: JitterRange::zero(),
            navigation_pause: JitterRange::zero(),
            post_alert_pause_ms: 0,
            interstitial_cooldown_ms: 0,
            challenge_settle_ms: 0,
        }
    }
}

/// File name for a diagnostic screenshot taken at a given stage and page.
pub fn screenshot_name(stage: &str, page: u32) -> String {
    format!("debug_6pm_{}_p{}.png", stage, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_sample_within_range() {
        let range = JitterRange::new(100, 400);
        for _ in 0..50 {
            let d = range.sample().as_millis() as u64;
            assert!((100..=400).contains(&d), "sampled {} out of range", d);
        }
    }

    #[test]
    fn test_jitter_zero_is_instant() {
        assert_eq!(JitterRange::zero().sample(), Duration::ZERO);
    }

    #[test]
    fn test_zeroed_pacing_has_no_delays() {
        let pacing = PacingConfig::zeroed();
        assert_eq!(pacing.initial_dwell.sample(), Duration::ZERO);
        assert_eq!(pacing.post_alert_pause_ms, 0);
        assert_eq!(pacing.interstitial_cooldown_ms, 0);
    }

    #[test]
    fn test_screenshot_name() {
        assert_eq!(screenshot_name("timeout", 3), "debug_6pm_timeout_p3.png");
    }
}
