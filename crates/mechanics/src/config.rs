//! Mechanic configuration.
//!
//! Periods and delays are in host ticks (20 per second on the reference host).

use edutools_core::Tick;
use edutools_navigation::SceneId;
use serde::{Deserialize, Serialize};

/// Helper sweep settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelperSweepConfig {
    /// Whether the sweep runs
    pub enabled: bool,
    /// Ticks between sweeps
    pub period: Tick,
    /// Maximum extra ticks added once at registration
    pub jitter: Tick,
}

impl Default for HelperSweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 200,
            jitter: 20,
        }
    }
}

impl HelperSweepConfig {
    /// Set the sweep period.
    pub fn with_period(mut self, period: Tick) -> Self {
        self.period = period;
        self
    }
}

/// Feedback prompt settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackPromptConfig {
    /// Whether actors are prompted
    pub enabled: bool,
    /// Ticks between prompt rounds
    pub interval: Tick,
    /// Maximum extra ticks added once at registration
    pub jitter: Tick,
    /// Ticks to wait before re-prompting a busy actor
    pub retry_delay: Tick,
    /// Scene shown as the prompt
    pub scene: SceneId,
}

impl Default for FeedbackPromptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: 6000,
            jitter: 600,
            retry_delay: 100,
            scene: SceneId::from("feedback_prompt"),
        }
    }
}

impl FeedbackPromptConfig {
    /// Set the prompt interval and jitter.
    pub fn with_interval(mut self, interval: Tick, jitter: Tick) -> Self {
        self.interval = interval;
        self.jitter = jitter;
        self
    }

    /// Set the busy retry delay.
    pub fn with_retry_delay(mut self, delay: Tick) -> Self {
        self.retry_delay = delay;
        self
    }
}

/// Restricted content scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentScanConfig {
    /// Whether inventories are scanned
    pub enabled: bool,
    /// Ticks between scan launches
    pub period: Tick,
    /// Maximum extra ticks added once at registration
    pub jitter: Tick,
    /// Item type patterns to remove
    pub patterns: Vec<String>,
    /// Ticks after launch at which an unfinished scan is cancelled
    pub max_job_ticks: Tick,
}

impl Default for ContentScanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 400,
            jitter: 40,
            patterns: vec![
                "^minecraft:tnt$".to_string(),
                "^minecraft:(chain_|repeating_)?command_block$".to_string(),
                "^minecraft:barrier$".to_string(),
            ],
            max_job_ticks: 200,
        }
    }
}

impl ContentScanConfig {
    /// Replace the restricted patterns.
    pub fn with_patterns<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the scan period.
    pub fn with_period(mut self, period: Tick) -> Self {
        self.period = period;
        self
    }

    /// Set the failsafe bound.
    pub fn with_max_job_ticks(mut self, ticks: Tick) -> Self {
        self.max_job_ticks = ticks;
        self
    }
}
