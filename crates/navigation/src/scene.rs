//! Scenes and the scene registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::form::{Form, Response};

/// Globally unique scene identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    /// Create a new scene ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How the actor's request resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOutcome {
    /// The actor submitted the form
    Confirmed(Response),
    /// The actor dismissed the form
    Cancelled,
    /// The form could not be shown because another one was open. Callers
    /// that want the form to reach the actor should retry; this is not a
    /// user decision.
    Busy,
}

/// Where navigation goes after a scene is entered or resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Open a scene. `push` records the current scene in history first;
    /// without it the switch replaces the current step.
    Open {
        /// Scene to open
        scene: SceneId,
        /// Whether to record the current scene in history
        push: bool,
    },
    /// Open `context.next_scene` (pushing history), or close if unset.
    Next,
    /// Rewind history by this many levels.
    Back(usize),
    /// Rewind to the nearest occurrence of a scene in history.
    BackTo(SceneId),
    /// End the flow and destroy its context.
    Close,
}

impl Transition {
    /// Open `scene`, recording the current scene in history.
    pub fn push(scene: impl Into<SceneId>) -> Self {
        Transition::Open {
            scene: scene.into(),
            push: true,
        }
    }

    /// Open `scene` in place of the current one.
    pub fn replace(scene: impl Into<SceneId>) -> Self {
        Transition::Open {
            scene: scene.into(),
            push: false,
        }
    }
}

/// What a scene does when it becomes current.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Render a form and wait for the actor.
    Show(Form),
    /// Navigate elsewhere immediately without showing anything.
    Redirect(Transition),
}

/// One step of a navigation flow.
pub trait Scene {
    /// Called once when the scene becomes current.
    fn enter(&mut self, context: &mut Context) -> Entry;

    /// Called once with the outcome of the form shown by [`Scene::enter`].
    fn resolve(&mut self, context: &mut Context, outcome: SceneOutcome) -> Transition;
}

/// Context references a scene needs before it can be built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Requirements {
    /// `context.subject` must be set
    pub subject: bool,
    /// `context.target` must be set
    pub target: bool,
}

impl Requirements {
    /// No requirements.
    pub fn none() -> Self {
        Self::default()
    }

    /// Require `context.subject`.
    pub fn subject(mut self) -> Self {
        self.subject = true;
        self
    }

    /// Require `context.target`.
    pub fn target(mut self) -> Self {
        self.target = true;
        self
    }

    /// First missing reference on `context`, if any.
    pub fn missing(&self, context: &Context) -> Option<&'static str> {
        if self.subject && context.subject.is_none() {
            Some("subject")
        } else if self.target && context.target.is_none() {
            Some("target")
        } else {
            None
        }
    }
}

/// Builds a scene instance for a context.
pub type SceneFactory = Box<dyn Fn(&Context) -> Box<dyn Scene>>;

struct Registration {
    requirements: Requirements,
    factory: SceneFactory,
}

/// Static mapping from scene id to factory, built at startup.
#[derive(Default)]
pub struct SceneRegistry {
    scenes: HashMap<SceneId, Registration>,
}

impl SceneRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scene with no context requirements.
    pub fn register<F, S>(&mut self, id: impl Into<SceneId>, factory: F)
    where
        F: Fn(&Context) -> S + 'static,
        S: Scene + 'static,
    {
        self.register_requiring(id, Requirements::none(), factory);
    }

    /// Register a scene that needs context references. If one is missing the
    /// engine shows the fallback scene instead of building this one.
    ///
    /// Registering an id twice replaces the earlier factory.
    pub fn register_requiring<F, S>(&mut self, id: impl Into<SceneId>, requirements: Requirements, factory: F)
    where
        F: Fn(&Context) -> S + 'static,
        S: Scene + 'static,
    {
        let id = id.into();
        let factory: SceneFactory = Box::new(move |context: &Context| -> Box<dyn Scene> { Box::new(factory(context)) });
        let registration = Registration { requirements, factory };
        if self.scenes.insert(id.clone(), registration).is_some() {
            debug!(scene = %id, "scene re-registered; last registration wins");
        }
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &SceneId) -> bool {
        self.scenes.contains_key(id)
    }

    /// Requirements declared for `id`.
    pub fn requirements(&self, id: &SceneId) -> Option<Requirements> {
        self.scenes.get(id).map(|registration| registration.requirements)
    }

    /// Build a scene instance.
    pub fn build(&self, id: &SceneId, context: &Context) -> Option<Box<dyn Scene>> {
        self.scenes.get(id).map(|registration| (registration.factory)(context))
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<SceneId> {
        let mut ids: Vec<SceneId> = self.scenes.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered scenes.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether no scenes are registered.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
