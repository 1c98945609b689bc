//! Navigation context: the data threaded through one flow.

use edutools_core::{ActorId, ContextId, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::scene::SceneId;

/// Reference to a secondary entity a flow operates on (a team, a player).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef(pub String);

impl EntityRef {
    /// Create a new entity reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// State of one navigation session.
///
/// Owned by the engine for the life of the flow. History and the current
/// scene only change through engine navigation; scenes read them and write
/// `data`, `subject`, `target`, and `next_scene`.
#[derive(Debug, Clone)]
pub struct Context {
    id: ContextId,
    source_actor: ActorId,

    /// Entity being edited
    pub subject: Option<EntityRef>,

    /// Entity being acted upon
    pub target: Option<EntityRef>,

    /// Form input passed between steps
    pub data: serde_json::Map<String, Value>,

    /// Scene to open on [`Transition::Next`](crate::Transition::Next)
    pub next_scene: Option<SceneId>,

    history: Vec<SceneId>,
    current: Option<SceneId>,
}

impl Context {
    /// Create a fresh context for `actor`.
    pub fn new(actor: ActorId) -> Self {
        Self {
            id: ContextId::new(),
            source_actor: actor,
            subject: None,
            target: None,
            data: serde_json::Map::new(),
            next_scene: None,
            history: Vec::new(),
            current: None,
        }
    }

    /// Set subject.
    pub fn with_subject(mut self, subject: impl Into<EntityRef>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set target.
    pub fn with_target(mut self, target: impl Into<EntityRef>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Seed a data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Session id.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Actor that started the flow.
    pub fn source_actor(&self) -> &ActorId {
        &self.source_actor
    }

    /// Previously current scenes, oldest first.
    pub fn history(&self) -> &[SceneId] {
        &self.history
    }

    /// Scene currently open for this context.
    pub fn current_scene(&self) -> Option<&SceneId> {
        self.current.as_ref()
    }

    /// Store a value in `data`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Typed read from `data`. Absent keys and shape mismatches are `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Remove a value from `data`.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Make `scene` current, recording the previous one in history when
    /// `push` is set.
    pub(crate) fn enter(&mut self, scene: SceneId, push: bool) {
        let previous = self.current.replace(scene);
        if push {
            if let Some(previous) = previous {
                self.history.push(previous);
            }
        }
    }

    /// Rewind `levels` entries. Returns the scene to reopen, or `None` when
    /// the rewind ran past the start of history (history is then empty).
    pub(crate) fn rewind(&mut self, levels: usize) -> Option<SceneId> {
        if levels == 0 {
            return self.current.clone();
        }
        if levels > self.history.len() {
            self.history.clear();
            return None;
        }
        self.history.truncate(self.history.len() - levels + 1);
        self.history.pop()
    }

    /// Rewind to the nearest occurrence of `scene`. History is truncated to
    /// just before it. Returns `false` (and leaves history alone) if `scene`
    /// never occurred.
    pub(crate) fn rewind_to(&mut self, scene: &SceneId) -> bool {
        match self.history.iter().rposition(|entry| entry == scene) {
            Some(index) => {
                self.history.truncate(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear_history(&mut self) {
        self.history.clear();
    }
}
