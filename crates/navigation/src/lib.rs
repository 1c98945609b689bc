//! Scene-based navigation for per-actor, multi-step dialogs.
//!
//! A flow starts by creating a [`Context`] for an actor and opening a scene by
//! id. Each scene renders one [`Form`] through the host's [`FormPresenter`]
//! and, once the actor answers, returns a [`Transition`] telling the engine
//! where to go next: forward (optionally recording history), back a number of
//! levels, back to a named scene, or nowhere.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod external;
pub mod form;
pub mod scene;
pub mod scenes;

pub use config::NavigationConfig;
pub use context::{Context, EntityRef};
pub use engine::{Navigation, NavigationEngine};
pub use error::{NavigationError, Result};
pub use external::{ExternalRequestError, ExternalSender, OpenSceneRequest, OPEN_SCENE_EVENT};
pub use form::{Button, DismissReason, Field, Form, FormPresenter, FormResponse, Presentation, Response};
pub use scene::{Entry, Requirements, Scene, SceneFactory, SceneId, SceneOutcome, SceneRegistry, Transition};
pub use scenes::{FallbackReason, MenuScene, NoticeScene, FALLBACK_REASON_KEY};
