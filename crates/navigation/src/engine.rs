//! The navigation engine: per-actor sessions, scene lifecycle, and history.

use std::collections::HashMap;

use edutools_core::{ActorId, RequestId};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::NavigationConfig;
use crate::context::Context;
use crate::error::{NavigationError, Result};
use crate::external::{ExternalSender, OpenSceneRequest};
use crate::form::{DismissReason, Form, FormPresenter, FormResponse, Presentation};
use crate::scene::{Entry, Requirements, Scene, SceneId, SceneOutcome, SceneRegistry, Transition};
use crate::scenes::{FallbackReason, FALLBACK_REASON_KEY};

/// Where a navigation call left the actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// A scene is on screen awaiting the actor
    Displaying(SceneId),
    /// The flow ended after the actor was found busy
    Busy,
    /// The flow ended and its context was destroyed
    Closed,
    /// The response did not belong to the current request
    Ignored,
}

struct Pending {
    request: RequestId,
    form: Form,
}

struct Session {
    context: Context,
    scene: Option<Box<dyn Scene>>,
    pending: Option<Pending>,
}

impl Session {
    fn new(context: Context) -> Self {
        Self {
            context,
            scene: None,
            pending: None,
        }
    }
}

/// Owns the scene registry and every actor's navigation session.
///
/// Constructed once at startup and passed by reference to whatever drives
/// it. All methods run on the host thread; nothing here blocks.
pub struct NavigationEngine<P: FormPresenter> {
    registry: SceneRegistry,
    presenter: P,
    config: NavigationConfig,
    sessions: HashMap<ActorId, Session>,
    external_tx: mpsc::UnboundedSender<OpenSceneRequest>,
    external_rx: mpsc::UnboundedReceiver<OpenSceneRequest>,
}

impl<P: FormPresenter> NavigationEngine<P> {
    /// Create an engine.
    pub fn new(registry: SceneRegistry, presenter: P, config: NavigationConfig) -> Self {
        let (external_tx, external_rx) = mpsc::unbounded_channel();
        Self {
            registry,
            presenter,
            config,
            sessions: HashMap::new(),
            external_tx,
            external_rx,
        }
    }

    /// Register a scene. Re-registering an id replaces the earlier factory.
    pub fn register_scene<F, S>(&mut self, id: impl Into<SceneId>, factory: F)
    where
        F: Fn(&Context) -> S + 'static,
        S: Scene + 'static,
    {
        self.registry.register(id, factory);
    }

    /// Register a scene that needs context references.
    pub fn register_scene_requiring<F, S>(&mut self, id: impl Into<SceneId>, requirements: Requirements, factory: F)
    where
        F: Fn(&Context) -> S + 'static,
        S: Scene + 'static,
    {
        self.registry.register_requiring(id, requirements, factory);
    }

    /// Get the scene registry.
    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    /// Get the presenter.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Get mutable presenter.
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Get the config.
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Start a flow for `actor` in a fresh context.
    ///
    /// Fails without showing anything if `scene` is not registered. Any flow
    /// the actor already had is replaced.
    pub fn create_context_and_open_scene(
        &mut self,
        actor: &ActorId,
        scene: impl Into<SceneId>,
    ) -> Result<Navigation> {
        let scene = scene.into();
        if !self.registry.contains(&scene) {
            error!(actor = %actor, scene = %scene, "cannot open unregistered scene");
            return Err(NavigationError::UnknownScene(scene));
        }
        self.start_flow(Context::new(actor.clone()), scene)
    }

    /// Start a flow on a caller-built context.
    ///
    /// The new session replaces the source actor's existing one only once a
    /// scene is actually displayed; a flow that ends busy, closed or in error
    /// leaves the existing session untouched.
    pub fn start_flow(&mut self, context: Context, scene: impl Into<SceneId>) -> Result<Navigation> {
        let actor = context.source_actor().clone();
        let scene = scene.into();
        info!(actor = %actor, scene = %scene, context = %context.id(), "starting navigation flow");

        let mut session = Session::new(context);
        let result = run_flow(
            &self.registry,
            &mut self.presenter,
            &self.config,
            &actor,
            &mut session,
            Transition::push(scene),
            false,
            &mut None,
        );
        if matches!(result, Ok(Navigation::Displaying(_))) {
            if let Some(previous) = self.sessions.insert(actor.clone(), session) {
                debug!(actor = %actor, context = %previous.context.id(), "replaced existing navigation session");
            }
        }
        result
    }

    /// Open `scene` in the actor's current context. With `push` the current
    /// scene is recorded in history; without it the switch replaces it.
    ///
    /// The new form replaces the one on screen. If nothing new can be shown
    /// (the actor is busy, or navigation fails) the session and its form are
    /// left as they were.
    pub fn open_scene_with_context(
        &mut self,
        actor: &ActorId,
        scene: impl Into<SceneId>,
        push: bool,
    ) -> Result<Navigation> {
        self.redirect(actor, Transition::Open { scene: scene.into(), push })
    }

    /// Rewind `levels` entries of history and reopen that scene. Rewinding
    /// past the start opens the root scene. `levels == 0` reopens the
    /// current scene.
    pub fn go_back(&mut self, actor: &ActorId, levels: usize) -> Result<Navigation> {
        self.redirect(actor, Transition::Back(levels))
    }

    /// Rewind to the nearest occurrence of `scene` in history and reopen it.
    /// A target that never occurred is logged and opens the root scene.
    pub fn go_back_to_scene(&mut self, actor: &ActorId, scene: impl Into<SceneId>) -> Result<Navigation> {
        self.redirect(actor, Transition::BackTo(scene.into()))
    }

    /// Hand the host's answer for `request` to the actor's current scene.
    ///
    /// Responses for an earlier request, or for an actor with no session,
    /// are ignored.
    pub fn deliver(&mut self, actor: &ActorId, request: RequestId, response: FormResponse) -> Result<Navigation> {
        let Some(session) = self.sessions.get_mut(actor) else {
            debug!(actor = %actor, request = %request, "response without a session ignored");
            return Ok(Navigation::Ignored);
        };

        let pending = match session.pending.take() {
            Some(pending) if pending.request == request => pending,
            other => {
                session.pending = other;
                debug!(actor = %actor, request = %request, "stale response ignored");
                return Ok(Navigation::Ignored);
            }
        };
        let Some(mut scene) = session.scene.take() else {
            return Ok(Navigation::Ignored);
        };

        let outcome = match response {
            FormResponse::Submitted(response) if pending.form.accepts(&response) => SceneOutcome::Confirmed(response),
            FormResponse::Submitted(response) => {
                warn!(actor = %actor, ?response, "response does not fit the shown form; treating as cancelled");
                SceneOutcome::Cancelled
            }
            FormResponse::Dismissed(DismissReason::UserBusy) => SceneOutcome::Busy,
            FormResponse::Dismissed(DismissReason::UserClosed) => SceneOutcome::Cancelled,
        };
        let busy = outcome == SceneOutcome::Busy;
        let transition = scene.resolve(&mut session.context, outcome);
        self.drive(actor, transition, busy)
    }

    /// Destroy the actor's session. Returns `false` if there was none.
    pub fn end_session(&mut self, actor: &ActorId) -> bool {
        match self.sessions.remove(actor) {
            Some(session) => {
                debug!(actor = %actor, context = %session.context.id(), "navigation session ended");
                true
            }
            None => false,
        }
    }

    /// Read-only view of an actor's context.
    pub fn session(&self, actor: &ActorId) -> Option<&Context> {
        self.sessions.get(actor).map(|session| &session.context)
    }

    /// Scene currently open for the actor.
    pub fn current_scene(&self, actor: &ActorId) -> Option<&SceneId> {
        self.session(actor).and_then(Context::current_scene)
    }

    /// Request id the actor's current form was shown under.
    pub fn pending_request(&self, actor: &ActorId) -> Option<RequestId> {
        self.sessions
            .get(actor)
            .and_then(|session| session.pending.as_ref())
            .map(|pending| pending.request)
    }

    /// Form currently shown to the actor.
    pub fn pending_form(&self, actor: &ActorId) -> Option<&Form> {
        self.sessions
            .get(actor)
            .and_then(|session| session.pending.as_ref())
            .map(|pending| &pending.form)
    }

    /// Whether a scene is awaiting the actor's response.
    pub fn is_displaying(&self, actor: &ActorId) -> bool {
        self.pending_request(actor).is_some()
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Sender for open-scene requests from outside actor interaction.
    pub fn external_requests(&self) -> ExternalSender {
        ExternalSender::new(self.external_tx.clone())
    }

    /// Handle every queued external request. Returns each request with its
    /// outcome so the caller can retry actors that were busy.
    pub fn pump_external(&mut self) -> Vec<(OpenSceneRequest, Result<Navigation>)> {
        let mut handled = Vec::new();
        while let Ok(request) = self.external_rx.try_recv() {
            let result = self.create_context_and_open_scene(&request.actor, request.scene.clone());
            match &result {
                Ok(Navigation::Busy) => {
                    info!(actor = %request.actor, scene = %request.scene, "external open-scene request found actor busy")
                }
                Err(error) => {
                    warn!(actor = %request.actor, scene = %request.scene, %error, "external open-scene request failed")
                }
                Ok(_) => {}
            }
            handled.push((request, result));
        }
        handled
    }

    fn drive(&mut self, actor: &ActorId, transition: Transition, busy: bool) -> Result<Navigation> {
        let Some(session) = self.sessions.get_mut(actor) else {
            return Err(NavigationError::NoSession(actor.clone()));
        };
        let result = run_flow(
            &self.registry,
            &mut self.presenter,
            &self.config,
            actor,
            session,
            transition,
            busy,
            &mut None,
        );
        if !matches!(result, Ok(Navigation::Displaying(_))) {
            self.end_session(actor);
        }
        result
    }

    /// Navigate a live session from outside a form answer. The session is
    /// rebuilt from a copy of its context and swapped in only once a new form
    /// is displayed.
    fn redirect(&mut self, actor: &ActorId, transition: Transition) -> Result<Navigation> {
        let Some(original) = self.sessions.remove(actor) else {
            return Err(NavigationError::NoSession(actor.clone()));
        };
        let mut replacing = original.pending.as_ref().map(|pending| pending.request);
        let mut session = Session::new(original.context.clone());
        let result = run_flow(
            &self.registry,
            &mut self.presenter,
            &self.config,
            actor,
            &mut session,
            transition,
            false,
            &mut replacing,
        );
        match &result {
            Ok(Navigation::Displaying(_)) => {
                self.sessions.insert(actor.clone(), session);
            }
            Ok(Navigation::Closed) => {
                if let Some(previous) = replacing {
                    self.presenter.retire(actor, previous);
                }
                debug!(actor = %actor, context = %original.context.id(), "navigation session ended");
            }
            _ => {
                debug!(actor = %actor, ?result, "nothing displayed; navigation session restored");
                self.sessions.insert(actor.clone(), original);
            }
        }
        result
    }
}

/// Follow transitions until a scene is shown or the flow ends. The first form
/// shown replaces the one under `replacing`, which is cleared once retired.
#[allow(clippy::too_many_arguments)]
fn run_flow<P: FormPresenter>(
    registry: &SceneRegistry,
    presenter: &mut P,
    config: &NavigationConfig,
    actor: &ActorId,
    session: &mut Session,
    mut transition: Transition,
    mut busy: bool,
    replacing: &mut Option<RequestId>,
) -> Result<Navigation> {
    let limit = config.max_redirect_depth;
    let mut depth = 0;
    let mut aborted = false;

    loop {
        let (scene, push) = match transition {
            Transition::Open { scene, push } => (scene, push),
            Transition::Next => match session.context.next_scene.take() {
                Some(scene) => (scene, true),
                None => return Ok(finished(busy)),
            },
            Transition::Back(levels) => match session.context.rewind(levels) {
                Some(scene) => (scene, false),
                None => (config.root_scene.clone(), false),
            },
            Transition::BackTo(target) => {
                if session.context.rewind_to(&target) {
                    (target, false)
                } else {
                    error!(actor = %actor, scene = %target, "back-to target never occurred in history; returning to root");
                    session.context.clear_history();
                    (config.root_scene.clone(), false)
                }
            }
            Transition::Close => return Ok(finished(busy)),
        };

        depth += 1;
        if depth > limit {
            if aborted {
                error!(actor = %actor, scene = %scene, limit, "redirect cycle reached the root scene; ending flow");
                return Err(NavigationError::RedirectLimit { scene, limit });
            }
            error!(actor = %actor, scene = %scene, limit, "redirect cycle detected; aborting flow to root scene");
            aborted = true;
            depth = 0;
            session.context.clear_history();
            transition = Transition::replace(config.root_scene.clone());
            continue;
        }

        let fallback = &config.fallback_scene;
        if !registry.contains(&scene) {
            if scene == *fallback || !registry.contains(fallback) {
                error!(actor = %actor, scene = %scene, "unknown scene and no fallback available");
                return Err(NavigationError::UnknownScene(scene));
            }
            error!(actor = %actor, scene = %scene, "unknown scene; showing fallback");
            set_fallback_reason(&mut session.context, FallbackReason::UnknownScene { scene });
            transition = Transition::Open {
                scene: fallback.clone(),
                push,
            };
            continue;
        }

        let missing = registry
            .requirements(&scene)
            .and_then(|requirements| requirements.missing(&session.context));
        if let Some(reference) = missing {
            if scene == *fallback || !registry.contains(fallback) {
                error!(actor = %actor, scene = %scene, reference, "missing context reference and no fallback available");
                return Err(NavigationError::MissingReference { scene, reference });
            }
            warn!(actor = %actor, scene = %scene, reference, "missing context reference; showing fallback");
            set_fallback_reason(
                &mut session.context,
                FallbackReason::MissingReference {
                    scene,
                    reference: reference.to_string(),
                },
            );
            transition = Transition::Open {
                scene: fallback.clone(),
                push,
            };
            continue;
        }

        session.context.enter(scene.clone(), push);
        session.scene = None;
        session.pending = None;
        let Some(mut instance) = registry.build(&scene, &session.context) else {
            return Err(NavigationError::UnknownScene(scene));
        };

        match instance.enter(&mut session.context) {
            Entry::Redirect(next) => {
                debug!(actor = %actor, scene = %scene, ?next, "scene redirected on entry");
                transition = next;
            }
            Entry::Show(form) => match show(presenter, actor, &form, replacing) {
                Presentation::Shown(request) => {
                    debug!(actor = %actor, scene = %scene, request = %request, "scene displayed");
                    session.scene = Some(instance);
                    session.pending = Some(Pending { request, form });
                    return Ok(Navigation::Displaying(scene));
                }
                Presentation::Busy => {
                    debug!(actor = %actor, scene = %scene, "actor busy; scene resolved as busy");
                    busy = true;
                    transition = instance.resolve(&mut session.context, SceneOutcome::Busy);
                }
            },
        }
    }
}

fn show<P: FormPresenter>(
    presenter: &mut P,
    actor: &ActorId,
    form: &Form,
    replacing: &mut Option<RequestId>,
) -> Presentation {
    match replacing.take() {
        Some(previous) => {
            let presentation = presenter.replace(actor, previous, form);
            if presentation == Presentation::Busy {
                *replacing = Some(previous);
            }
            presentation
        }
        None => presenter.present(actor, form),
    }
}

fn finished(busy: bool) -> Navigation {
    if busy {
        Navigation::Busy
    } else {
        Navigation::Closed
    }
}

fn set_fallback_reason(context: &mut Context, reason: FallbackReason) {
    match serde_json::to_value(&reason) {
        Ok(value) => context.set(FALLBACK_REASON_KEY, value),
        Err(error) => warn!(%error, "failed to record fallback reason"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::Response;
    use crate::scenes::NoticeScene;
    use edutools_core::Text;
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::rc::Rc;

    #[derive(Default)]
    struct RecordingPresenter {
        shown: Vec<(ActorId, Form)>,
        busy: HashSet<ActorId>,
    }

    impl FormPresenter for RecordingPresenter {
        fn present(&mut self, actor: &ActorId, form: &Form) -> Presentation {
            if self.busy.contains(actor) {
                return Presentation::Busy;
            }
            self.shown.push((actor.clone(), form.clone()));
            Presentation::Shown(RequestId::new())
        }
    }

    /// Button 0 pushes `next`, button 1 goes back one level.
    struct Page {
        title: &'static str,
        next: Option<&'static str>,
    }

    impl Scene for Page {
        fn enter(&mut self, _context: &mut Context) -> Entry {
            Entry::Show(Form::action(Text::raw(self.title)).button("next").button("back"))
        }

        fn resolve(&mut self, _context: &mut Context, outcome: SceneOutcome) -> Transition {
            match (outcome, self.next) {
                (SceneOutcome::Confirmed(Response::Button(0)), Some(next)) => Transition::push(next),
                (SceneOutcome::Confirmed(Response::Button(1)), _) => Transition::Back(1),
                _ => Transition::Close,
            }
        }
    }

    struct Bounce(&'static str);

    impl Scene for Bounce {
        fn enter(&mut self, _context: &mut Context) -> Entry {
            Entry::Redirect(Transition::push(self.0))
        }

        fn resolve(&mut self, _context: &mut Context, _outcome: SceneOutcome) -> Transition {
            Transition::Close
        }
    }

    struct Recorder(Rc<RefCell<Vec<SceneOutcome>>>);

    impl Scene for Recorder {
        fn enter(&mut self, _context: &mut Context) -> Entry {
            Entry::Show(Form::message("prompt", "body", "ok", "cancel"))
        }

        fn resolve(&mut self, _context: &mut Context, outcome: SceneOutcome) -> Transition {
            self.0.borrow_mut().push(outcome);
            Transition::Close
        }
    }

    fn engine_with(config: NavigationConfig) -> NavigationEngine<RecordingPresenter> {
        let mut registry = SceneRegistry::new();
        registry.register("main", |_| Page { title: "main", next: Some("a") });
        registry.register("a", |_| Page { title: "a", next: Some("b") });
        registry.register("b", |_| Page { title: "b", next: Some("c") });
        registry.register("c", |_| Page { title: "c", next: None });
        registry.register("notice", |_| NoticeScene::fallback());
        registry.register("loop_a", |_| Bounce("loop_b"));
        registry.register("loop_b", |_| Bounce("loop_a"));
        NavigationEngine::new(registry, RecordingPresenter::default(), config)
    }

    fn engine() -> NavigationEngine<RecordingPresenter> {
        engine_with(NavigationConfig::default())
    }

    fn actor() -> ActorId {
        ActorId::from("alex")
    }

    fn respond(engine: &mut NavigationEngine<RecordingPresenter>, response: FormResponse) -> Navigation {
        let request = engine.pending_request(&actor()).unwrap();
        engine.deliver(&actor(), request, response).unwrap()
    }

    fn press(engine: &mut NavigationEngine<RecordingPresenter>, button: usize) -> Navigation {
        respond(engine, FormResponse::Submitted(Response::Button(button)))
    }

    fn history(engine: &NavigationEngine<RecordingPresenter>) -> Vec<SceneId> {
        engine.session(&actor()).unwrap().history().to_vec()
    }

    fn displaying(scene: &str) -> Navigation {
        Navigation::Displaying(scene.into())
    }

    #[test]
    fn test_forward_then_back_to_first_scene() {
        let mut engine = engine();
        assert_eq!(engine.create_context_and_open_scene(&actor(), "a").unwrap(), displaying("a"));
        assert_eq!(press(&mut engine, 0), displaying("b"));
        assert_eq!(press(&mut engine, 0), displaying("c"));
        assert_eq!(history(&engine), vec![SceneId::from("a"), SceneId::from("b")]);

        assert_eq!(engine.go_back_to_scene(&actor(), "a").unwrap(), displaying("a"));
        assert!(history(&engine).is_empty());
        assert_eq!(engine.current_scene(&actor()), Some(&"a".into()));
    }

    #[test]
    fn test_go_back_reopens_scene_before_push() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        engine.open_scene_with_context(&actor(), "c", true).unwrap();
        assert_eq!(engine.go_back(&actor(), 1).unwrap(), displaying("a"));
        assert!(history(&engine).is_empty());
    }

    #[test]
    fn test_back_button_on_scene() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        press(&mut engine, 0);
        assert_eq!(press(&mut engine, 1), displaying("a"));
    }

    #[test]
    fn test_replace_does_not_grow_history() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        press(&mut engine, 0);
        assert_eq!(engine.open_scene_with_context(&actor(), "c", false).unwrap(), displaying("c"));
        assert_eq!(history(&engine), vec![SceneId::from("a")]);

        assert_eq!(engine.go_back(&actor(), 0).unwrap(), displaying("c"));
        assert_eq!(history(&engine).len(), 1);
    }

    #[test]
    fn test_go_back_past_start_opens_root() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        assert_eq!(engine.go_back(&actor(), 3).unwrap(), displaying("main"));
        assert!(history(&engine).is_empty());
    }

    #[test]
    fn test_back_to_unvisited_scene_opens_root() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        press(&mut engine, 0);
        assert_eq!(engine.go_back_to_scene(&actor(), "c").unwrap(), displaying("main"));
        assert!(history(&engine).is_empty());
    }

    #[test]
    fn test_missing_reference_shows_fallback_without_building_scene() {
        let mut engine = engine();
        let built = Rc::new(Cell::new(0));
        let counter = built.clone();
        engine.register_scene_requiring("edit_team", Requirements::none().subject(), move |_| {
            counter.set(counter.get() + 1);
            Page { title: "edit", next: None }
        });

        assert_eq!(engine.create_context_and_open_scene(&actor(), "edit_team").unwrap(), displaying("notice"));
        assert_eq!(built.get(), 0);
        match engine.pending_form(&actor()) {
            Some(Form::Message { body, .. }) => assert_eq!(
                body,
                &Text::key_with("edutools.notice.missing_reference", ["edit_team", "subject"])
            ),
            other => panic!("unexpected form {other:?}"),
        }

        let context = Context::new(actor()).with_subject("team_red");
        assert_eq!(engine.start_flow(context, "edit_team").unwrap(), displaying("edit_team"));
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn test_unknown_scene_mid_flow_shows_fallback() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        assert_eq!(engine.open_scene_with_context(&actor(), "nowhere", true).unwrap(), displaying("notice"));
        assert_eq!(history(&engine), vec![SceneId::from("a")]);

        let back = respond(&mut engine, FormResponse::Submitted(Response::Accepted(true)));
        assert_eq!(back, displaying("a"));
    }

    #[test]
    fn test_unknown_scene_on_create_fails_without_showing() {
        let mut engine = engine();
        assert_eq!(
            engine.create_context_and_open_scene(&actor(), "nowhere"),
            Err(NavigationError::UnknownScene("nowhere".into()))
        );
        assert_eq!(engine.session_count(), 0);
        assert!(engine.presenter().shown.is_empty());
    }

    #[test]
    fn test_redirect_cycle_aborts_to_root() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        assert_eq!(engine.open_scene_with_context(&actor(), "loop_a", true).unwrap(), displaying("main"));
        assert!(history(&engine).is_empty());
    }

    #[test]
    fn test_redirect_cycle_through_root_ends_flow() {
        let mut engine = engine_with(NavigationConfig::default().with_root_scene("loop_a").with_max_redirect_depth(4));
        let result = engine.create_context_and_open_scene(&actor(), "loop_b");
        assert!(matches!(result, Err(NavigationError::RedirectLimit { limit: 4, .. })));
        assert!(engine.session(&actor()).is_none());
    }

    #[test]
    fn test_busy_presenter_resolves_busy() {
        let mut engine = engine();
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let shared = outcomes.clone();
        engine.register_scene("feedback_prompt", move |_| Recorder(shared.clone()));
        engine.presenter_mut().busy.insert(actor());

        assert_eq!(engine.create_context_and_open_scene(&actor(), "feedback_prompt").unwrap(), Navigation::Busy);
        assert_eq!(*outcomes.borrow(), vec![SceneOutcome::Busy]);
        assert!(engine.session(&actor()).is_none());
    }

    #[test]
    fn test_busy_flow_keeps_existing_session() {
        let mut engine = engine();
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let shared = outcomes.clone();
        engine.register_scene("feedback_prompt", move |_| Recorder(shared.clone()));

        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        press(&mut engine, 0);
        engine.presenter_mut().busy.insert(actor());

        assert_eq!(engine.create_context_and_open_scene(&actor(), "feedback_prompt").unwrap(), Navigation::Busy);
        assert_eq!(engine.current_scene(&actor()), Some(&"b".into()));
        assert_eq!(history(&engine), vec![SceneId::from("a")]);
    }

    #[test]
    fn test_dismissals_map_to_busy_and_cancelled() {
        let mut engine = engine();
        let outcomes = Rc::new(RefCell::new(Vec::new()));
        let shared = outcomes.clone();
        engine.register_scene("feedback_prompt", move |_| Recorder(shared.clone()));

        engine.create_context_and_open_scene(&actor(), "feedback_prompt").unwrap();
        assert_eq!(respond(&mut engine, FormResponse::Dismissed(DismissReason::UserBusy)), Navigation::Busy);

        engine.create_context_and_open_scene(&actor(), "feedback_prompt").unwrap();
        assert_eq!(respond(&mut engine, FormResponse::Dismissed(DismissReason::UserClosed)), Navigation::Closed);

        engine.create_context_and_open_scene(&actor(), "feedback_prompt").unwrap();
        respond(&mut engine, FormResponse::Submitted(Response::Button(0)));

        assert_eq!(
            *outcomes.borrow(),
            vec![SceneOutcome::Busy, SceneOutcome::Cancelled, SceneOutcome::Cancelled]
        );
    }

    #[test]
    fn test_stale_response_ignored() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        let stale = engine.pending_request(&actor()).unwrap();
        press(&mut engine, 0);

        let result = engine.deliver(&actor(), stale, FormResponse::Submitted(Response::Button(1)));
        assert_eq!(result, Ok(Navigation::Ignored));
        assert_eq!(engine.current_scene(&actor()), Some(&"b".into()));

        let stranger = engine.deliver(&ActorId::from("sam"), stale, FormResponse::Submitted(Response::Button(0)));
        assert_eq!(stranger, Ok(Navigation::Ignored));
    }

    #[test]
    fn test_next_transition_uses_next_scene() {
        struct Wizard;

        impl Scene for Wizard {
            fn enter(&mut self, _context: &mut Context) -> Entry {
                Entry::Show(Form::action("wizard").button("go"))
            }

            fn resolve(&mut self, context: &mut Context, _outcome: SceneOutcome) -> Transition {
                context.next_scene = Some("c".into());
                Transition::Next
            }
        }

        let mut engine = engine();
        engine.register_scene("wizard", |_| Wizard);
        engine.create_context_and_open_scene(&actor(), "wizard").unwrap();
        assert_eq!(press(&mut engine, 0), displaying("c"));
        assert_eq!(history(&engine), vec![SceneId::from("wizard")]);
        assert_eq!(engine.session(&actor()).unwrap().next_scene, None);
    }

    #[test]
    fn test_close_destroys_context() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "c").unwrap();
        assert_eq!(press(&mut engine, 0), Navigation::Closed);
        assert!(engine.session(&actor()).is_none());
        assert_eq!(engine.go_back(&actor(), 1), Err(NavigationError::NoSession(actor())));
    }

    #[test]
    fn test_end_session() {
        let mut engine = engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        assert!(engine.is_displaying(&actor()));
        assert!(engine.end_session(&actor()));
        assert!(!engine.end_session(&actor()));
        assert!(!engine.is_displaying(&actor()));
    }

    /// Keeps one form per actor on screen and refuses another until it is
    /// answered or retired, as a real host does.
    #[derive(Default)]
    struct HoldingPresenter {
        open: HashMap<ActorId, RequestId>,
        occupied: HashSet<ActorId>,
    }

    impl FormPresenter for HoldingPresenter {
        fn present(&mut self, actor: &ActorId, _form: &Form) -> Presentation {
            if self.occupied.contains(actor) || self.open.contains_key(actor) {
                return Presentation::Busy;
            }
            let request = RequestId::new();
            self.open.insert(actor.clone(), request);
            Presentation::Shown(request)
        }

        fn retire(&mut self, actor: &ActorId, request: RequestId) {
            if self.open.get(actor) == Some(&request) {
                self.open.remove(actor);
            }
        }

        fn replace(&mut self, actor: &ActorId, previous: RequestId, form: &Form) -> Presentation {
            if self.occupied.contains(actor) {
                return Presentation::Busy;
            }
            self.retire(actor, previous);
            self.present(actor, form)
        }
    }

    fn holding_engine_with(config: NavigationConfig) -> NavigationEngine<HoldingPresenter> {
        let mut registry = SceneRegistry::new();
        registry.register("main", |_| Page { title: "main", next: Some("a") });
        registry.register("a", |_| Page { title: "a", next: Some("b") });
        registry.register("b", |_| Page { title: "b", next: None });
        registry.register("notice", |_| NoticeScene::fallback());
        registry.register("exit", |_| Bounce("exit_close"));
        registry.register("exit_close", |_| Closer);
        NavigationEngine::new(registry, HoldingPresenter::default(), config)
    }

    fn holding_engine() -> NavigationEngine<HoldingPresenter> {
        holding_engine_with(NavigationConfig::default())
    }

    struct Closer;

    impl Scene for Closer {
        fn enter(&mut self, _context: &mut Context) -> Entry {
            Entry::Redirect(Transition::Close)
        }

        fn resolve(&mut self, _context: &mut Context, _outcome: SceneOutcome) -> Transition {
            Transition::Close
        }
    }

    /// Take the host's copy of the actor's form and answer it.
    fn answer(engine: &mut NavigationEngine<HoldingPresenter>, button: usize) -> Navigation {
        let request = engine.presenter_mut().open.remove(&actor()).unwrap();
        engine
            .deliver(&actor(), request, FormResponse::Submitted(Response::Button(button)))
            .unwrap()
    }

    #[test]
    fn test_open_replaces_form_on_screen() {
        let mut engine = holding_engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        let first = engine.pending_request(&actor()).unwrap();

        assert_eq!(engine.open_scene_with_context(&actor(), "b", true).unwrap(), displaying("b"));
        let second = engine.pending_request(&actor()).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.presenter().open.get(&actor()), Some(&second));
        assert_eq!(engine.session(&actor()).unwrap().history().to_vec(), vec![SceneId::from("a")]);

        let stale = engine.deliver(&actor(), first, FormResponse::Submitted(Response::Button(1)));
        assert_eq!(stale, Ok(Navigation::Ignored));
        assert_eq!(answer(&mut engine, 1), displaying("a"));
    }

    #[test]
    fn test_refresh_reshows_current_form() {
        let mut engine = holding_engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        let first = engine.pending_request(&actor()).unwrap();

        assert_eq!(engine.go_back(&actor(), 0).unwrap(), displaying("a"));
        let refreshed = engine.pending_request(&actor()).unwrap();
        assert_ne!(first, refreshed);
        assert_eq!(engine.presenter().open.get(&actor()), Some(&refreshed));
        assert_eq!(answer(&mut engine, 0), displaying("b"));
    }

    #[test]
    fn test_busy_redirect_restores_session() {
        let mut engine = holding_engine();
        engine.create_context_and_open_scene(&actor(), "main").unwrap();
        answer(&mut engine, 0);
        let request = engine.pending_request(&actor()).unwrap();
        engine.presenter_mut().occupied.insert(actor());

        assert_eq!(engine.open_scene_with_context(&actor(), "b", true).unwrap(), Navigation::Busy);
        assert_eq!(engine.go_back(&actor(), 1).unwrap(), Navigation::Busy);
        assert_eq!(engine.current_scene(&actor()), Some(&"a".into()));
        assert_eq!(engine.session(&actor()).unwrap().history().to_vec(), vec![SceneId::from("main")]);
        assert_eq!(engine.pending_request(&actor()), Some(request));
        assert_eq!(engine.presenter().open.get(&actor()), Some(&request));

        engine.presenter_mut().occupied.clear();
        assert_eq!(answer(&mut engine, 0), displaying("b"));
    }

    #[test]
    fn test_failed_redirect_restores_session() {
        let mut engine = holding_engine_with(NavigationConfig::default().with_fallback_scene("absent"));
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        let request = engine.pending_request(&actor()).unwrap();

        assert_eq!(
            engine.open_scene_with_context(&actor(), "nowhere", true),
            Err(NavigationError::UnknownScene("nowhere".into()))
        );
        assert_eq!(engine.current_scene(&actor()), Some(&"a".into()));
        assert!(engine.session(&actor()).unwrap().history().is_empty());
        assert_eq!(engine.pending_request(&actor()), Some(request));
    }

    #[test]
    fn test_redirect_that_closes_retires_form() {
        let mut engine = holding_engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();

        assert_eq!(engine.open_scene_with_context(&actor(), "exit", true).unwrap(), Navigation::Closed);
        assert!(engine.session(&actor()).is_none());
        assert!(engine.presenter().open.is_empty());
    }

    #[test]
    fn test_external_request_reports_busy_actor() {
        let mut engine = holding_engine();
        engine.create_context_and_open_scene(&actor(), "a").unwrap();
        let sender = engine.external_requests();
        let request = OpenSceneRequest {
            actor: actor(),
            scene: "b".into(),
        };
        assert!(sender.send(request.clone()));

        let handled = engine.pump_external();
        assert_eq!(handled, vec![(request, Ok(Navigation::Busy))]);
        assert_eq!(engine.current_scene(&actor()), Some(&"a".into()));
    }

    #[tokio::test]
    async fn test_external_requests_open_scenes() {
        let mut engine = engine();
        let sender = engine.external_requests();
        tokio::spawn(async move {
            sender.send(OpenSceneRequest {
                actor: ActorId::from("alex"),
                scene: "b".into(),
            });
            sender.send(OpenSceneRequest {
                actor: ActorId::from("sam"),
                scene: "nowhere".into(),
            });
        })
        .await
        .unwrap();

        let handled = engine.pump_external();
        assert_eq!(handled.len(), 2);
        assert_eq!(handled[0].1, Ok(displaying("b")));
        assert_eq!(handled[1].1, Err(NavigationError::UnknownScene("nowhere".into())));
        assert_eq!(engine.current_scene(&actor()), Some(&"b".into()));
        assert!(engine.session(&ActorId::from("sam")).is_none());
        assert!(engine.pump_external().is_empty());
    }
}
