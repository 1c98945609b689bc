//! Console configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use edutools_mechanics::{ContentScanConfig, FeedbackPromptConfig, HelperSweepConfig};
use edutools_navigation::NavigationConfig;
use edutools_scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};

/// Everything the console needs to start. Missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Wall-clock milliseconds per host tick
    pub tick_millis: u64,
    /// Property store file
    pub store_path: PathBuf,
    /// `.lang` translation file; keys are shown raw without one
    pub lang_path: Option<PathBuf>,
    /// Scheduler budget
    pub scheduler: SchedulerConfig,
    /// Navigation engine
    pub navigation: NavigationConfig,
    /// Helper sweep
    pub sweep: HelperSweepConfig,
    /// Feedback prompt
    pub feedback: FeedbackPromptConfig,
    /// Restricted content scan
    pub content_scan: ContentScanConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            tick_millis: 50,
            store_path: PathBuf::from(".edutools/properties.json"),
            lang_path: None,
            scheduler: SchedulerConfig::default(),
            navigation: NavigationConfig::default(),
            sweep: HelperSweepConfig::default(),
            feedback: FeedbackPromptConfig::default(),
            content_scan: ContentScanConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load from a JSON file, or defaults when no file is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Set the tick length.
    pub fn with_tick_millis(mut self, millis: u64) -> Self {
        self.tick_millis = millis.max(1);
        self
    }

    /// Set the property store file.
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Set the translation file.
    pub fn with_lang_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lang_path = Some(path.into());
        self
    }
}
