//! Built-in scenes: the fallback notice and a simple menu.

use edutools_core::Text;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::form::{Form, Response};
use crate::scene::{Entry, Scene, SceneId, SceneOutcome, Transition};

/// Context data key the engine fills before redirecting to the fallback scene.
pub const FALLBACK_REASON_KEY: &str = "fallback_reason";

/// Why the engine showed the fallback scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// A flow navigated to an unregistered scene
    UnknownScene {
        /// Requested scene
        scene: SceneId,
    },
    /// A scene's required context reference was missing
    MissingReference {
        /// Requested scene
        scene: SceneId,
        /// `subject` or `target`
        reference: String,
    },
}

/// Informative message screen. Confirm goes back one level, anything else
/// closes the flow.
#[derive(Debug, Clone)]
pub struct NoticeScene {
    title: Text,
    body: Text,
}

impl NoticeScene {
    /// A notice with fixed text.
    pub fn new(title: impl Into<Text>, body: impl Into<Text>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// The engine's fallback screen.
    pub fn fallback() -> Self {
        Self::new("edutools.notice.title", "edutools.notice.generic")
    }
}

impl Scene for NoticeScene {
    fn enter(&mut self, context: &mut Context) -> Entry {
        let body = match context.get::<FallbackReason>(FALLBACK_REASON_KEY) {
            Some(FallbackReason::UnknownScene { scene }) => {
                Text::key_with("edutools.notice.unknown_scene", [scene.0])
            }
            Some(FallbackReason::MissingReference { scene, reference }) => {
                Text::key_with("edutools.notice.missing_reference", [scene.0, reference])
            }
            None => self.body.clone(),
        };
        Entry::Show(Form::message(
            self.title.clone(),
            body,
            "edutools.button.back",
            "edutools.button.close",
        ))
    }

    fn resolve(&mut self, context: &mut Context, outcome: SceneOutcome) -> Transition {
        context.take(FALLBACK_REASON_KEY);
        match outcome {
            SceneOutcome::Confirmed(Response::Accepted(true)) => Transition::Back(1),
            _ => Transition::Close,
        }
    }
}

/// Action form whose buttons open other scenes, pushing history.
#[derive(Debug, Clone)]
pub struct MenuScene {
    title: Text,
    body: Option<Text>,
    entries: Vec<(Text, SceneId)>,
}

impl MenuScene {
    /// An empty menu.
    pub fn new(title: impl Into<Text>) -> Self {
        Self {
            title: title.into(),
            body: None,
            entries: Vec::new(),
        }
    }

    /// Set body text.
    pub fn body(mut self, body: impl Into<Text>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add an entry.
    pub fn entry(mut self, label: impl Into<Text>, scene: impl Into<SceneId>) -> Self {
        self.entries.push((label.into(), scene.into()));
        self
    }
}

impl Scene for MenuScene {
    fn enter(&mut self, _context: &mut Context) -> Entry {
        let mut form = Form::action(self.title.clone());
        if let Some(body) = &self.body {
            form = form.body(body.clone());
        }
        for (label, _) in &self.entries {
            form = form.button(label.clone());
        }
        Entry::Show(form)
    }

    fn resolve(&mut self, context: &mut Context, outcome: SceneOutcome) -> Transition {
        match outcome {
            SceneOutcome::Confirmed(Response::Button(index)) => match self.entries.get(index) {
                Some((_, scene)) => Transition::push(scene.clone()),
                None => Transition::Close,
            },
            SceneOutcome::Cancelled if !context.history().is_empty() => Transition::Back(1),
            _ => Transition::Close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutools_core::ActorId;

    #[test]
    fn test_notice_renders_fallback_reason() {
        let mut context = Context::new(ActorId::from("teacher"));
        let reason = FallbackReason::MissingReference {
            scene: "edit_team".into(),
            reference: "subject".to_string(),
        };
        context.set(FALLBACK_REASON_KEY, serde_json::to_value(&reason).unwrap());

        let mut notice = NoticeScene::fallback();
        match notice.enter(&mut context) {
            Entry::Show(Form::Message { body, .. }) => assert_eq!(
                body,
                Text::key_with("edutools.notice.missing_reference", ["edit_team", "subject"])
            ),
            other => panic!("unexpected entry {other:?}"),
        }

        let transition = notice.resolve(&mut context, SceneOutcome::Confirmed(Response::Accepted(true)));
        assert_eq!(transition, Transition::Back(1));
        assert!(context.get::<FallbackReason>(FALLBACK_REASON_KEY).is_none());
    }

    #[test]
    fn test_menu_routes_buttons() {
        let mut context = Context::new(ActorId::from("teacher"));
        let mut menu = MenuScene::new("edutools.menu.title")
            .entry("edutools.menu.teams", "teams")
            .entry("edutools.menu.feedback", "feedback_prompt");

        assert!(matches!(menu.enter(&mut context), Entry::Show(Form::Action { ref buttons, .. }) if buttons.len() == 2));
        assert_eq!(
            menu.resolve(&mut context, SceneOutcome::Confirmed(Response::Button(1))),
            Transition::push("feedback_prompt")
        );
        assert_eq!(menu.resolve(&mut context, SceneOutcome::Cancelled), Transition::Close);
        assert_eq!(menu.resolve(&mut context, SceneOutcome::Busy), Transition::Close);
    }
}
