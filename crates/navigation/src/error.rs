//! Navigation errors.

use edutools_core::ActorId;

use crate::scene::SceneId;

/// Result alias for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;

/// Errors surfaced by the navigation engine.
///
/// None of these are fatal to the process: the engine logs them and either
/// redirects to the fallback scene or ends the affected flow.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NavigationError {
    /// Scene id was never registered and no fallback could be shown
    #[error("Unknown scene: {0}")]
    UnknownScene(SceneId),

    /// Actor has no open navigation session
    #[error("No navigation session for actor {0}")]
    NoSession(ActorId),

    /// Scene needs a context reference and no fallback scene is registered
    #[error("Scene {scene} requires a {reference} reference")]
    MissingReference {
        /// Scene that declared the requirement
        scene: SceneId,
        /// Missing reference name
        reference: &'static str,
    },

    /// Redirects kept bouncing past the configured depth, even after
    /// aborting to the root scene
    #[error("Redirect limit of {limit} exceeded while opening {scene}")]
    RedirectLimit {
        /// Scene being opened when the bound tripped
        scene: SceneId,
        /// Configured bound
        limit: usize,
    },
}
