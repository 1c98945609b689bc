//! Scheduler budget configuration.

use serde::{Deserialize, Serialize};

/// Budget and seeding for a [`TaskScheduler`](crate::TaskScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Job steps executed per job per tick
    pub steps_per_quantum: usize,
    /// Fixed RNG seed for jitter (None = seeded from entropy)
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            steps_per_quantum: 8,
            seed: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a new config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set steps per quantum. Zero is raised to one.
    pub fn with_steps_per_quantum(mut self, steps: usize) -> Self {
        self.steps_per_quantum = steps.max(1);
        self
    }

    /// Seed the jitter RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
