//! Navigation engine configuration.

use serde::{Deserialize, Serialize};

use crate::scene::SceneId;

/// Configuration for the navigation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Scene opened when history is rewound past its start or a flow aborts
    pub root_scene: SceneId,
    /// Informative scene shown on lookup failures and missing references
    pub fallback_scene: SceneId,
    /// Maximum scene openings in one navigation step before aborting
    pub max_redirect_depth: usize,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            root_scene: SceneId::from("main"),
            fallback_scene: SceneId::from("notice"),
            max_redirect_depth: 16,
        }
    }
}

impl NavigationConfig {
    /// Create a new config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root scene.
    pub fn with_root_scene(mut self, scene: impl Into<SceneId>) -> Self {
        self.root_scene = scene.into();
        self
    }

    /// Set the fallback scene.
    pub fn with_fallback_scene(mut self, scene: impl Into<SceneId>) -> Self {
        self.fallback_scene = scene.into();
        self
    }

    /// Set the redirect depth bound.
    pub fn with_max_redirect_depth(mut self, depth: usize) -> Self {
        self.max_redirect_depth = depth.max(1);
        self
    }
}
