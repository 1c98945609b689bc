//! Open-scene requests arriving from outside normal actor interaction.
//!
//! Other parts of the host (or external tooling) post on the named
//! `edutools:open_scene` channel. The engine owns the only receiver and drains
//! it once per tick in [`NavigationEngine::pump_external`](crate::NavigationEngine::pump_external).

use edutools_core::ActorId;
use tokio::sync::mpsc;

use crate::scene::SceneId;

/// Name of the host event channel carrying open-scene requests.
pub const OPEN_SCENE_EVENT: &str = "edutools:open_scene";

/// Ask the engine to open `scene` for `actor` in a fresh context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSceneRequest {
    /// Actor to show the scene to
    pub actor: ActorId,
    /// Scene to open
    pub scene: SceneId,
}

/// Errors parsing an open-scene event.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExternalRequestError {
    /// Event arrived on another channel
    #[error("Not an open-scene event: {0}")]
    WrongChannel(String),

    /// Neither the event source nor the message named an actor
    #[error("Open-scene event names no actor")]
    MissingActor,

    /// Message named no scene
    #[error("Open-scene event names no scene")]
    MissingScene,

    /// Message had trailing tokens
    #[error("Malformed open-scene message: {0}")]
    Malformed(String),
}

impl OpenSceneRequest {
    /// Parse a host event. The message is either `<scene>` (the event's
    /// source actor is the target) or `<actor> <scene>`.
    pub fn from_event(
        event_id: &str,
        message: &str,
        source: Option<&ActorId>,
    ) -> Result<Self, ExternalRequestError> {
        if event_id != OPEN_SCENE_EVENT {
            return Err(ExternalRequestError::WrongChannel(event_id.to_string()));
        }

        let tokens: Vec<&str> = message.split_whitespace().collect();
        match (tokens.as_slice(), source) {
            ([], _) => Err(ExternalRequestError::MissingScene),
            ([scene], Some(actor)) => Ok(Self {
                actor: actor.clone(),
                scene: SceneId::from(*scene),
            }),
            ([_], None) => Err(ExternalRequestError::MissingActor),
            ([actor, scene], _) => Ok(Self {
                actor: ActorId::from(*actor),
                scene: SceneId::from(*scene),
            }),
            _ => Err(ExternalRequestError::Malformed(message.to_string())),
        }
    }
}

/// Cloneable handle for posting open-scene requests.
#[derive(Debug, Clone)]
pub struct ExternalSender {
    tx: mpsc::UnboundedSender<OpenSceneRequest>,
}

impl ExternalSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<OpenSceneRequest>) -> Self {
        Self { tx }
    }

    /// Queue a request. Returns `false` if the engine is gone.
    pub fn send(&self, request: OpenSceneRequest) -> bool {
        self.tx.send(request).is_ok()
    }
}
