//! Periodic feedback prompt.
//!
//! Every round, each online actor without an open prompt gets one, shown by
//! their linked helper. Busy outcomes re-arm a one-shot retry; a dismissal is
//! the actor's decision and is not retried.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use edutools_core::{ActorId, Value};
use edutools_host::{ConsolePresenter, Environment, PropertyStore, ScopedStore};
use edutools_navigation::{
    Context, EntityRef, Entry, Field, Form, Navigation, NavigationEngine, Requirements, Response, Scene, SceneId,
    SceneOutcome, Transition,
};
use edutools_scheduler::TaskHandle;
use tracing::{debug, info, warn};

use crate::config::FeedbackPromptConfig;
use crate::world::{Console, ConsoleScheduler};

/// Property store area for feedback answers.
pub const STORE_AREA: &str = "feedback";

#[derive(Debug, Clone, PartialEq)]
enum FeedbackEvent {
    Submitted {
        actor: ActorId,
        rating: f64,
        comment: String,
    },
    Dismissed(ActorId),
    Busy(ActorId),
}

#[derive(Debug, Default)]
struct FeedbackState {
    events: Vec<FeedbackEvent>,
    retrying: HashSet<ActorId>,
}

type SharedState = Rc<RefCell<FeedbackState>>;

/// Rating and comment form. Needs `context.target` set to the helper
/// presenting it.
pub struct FeedbackScene {
    state: SharedState,
}

impl Scene for FeedbackScene {
    fn enter(&mut self, _context: &mut Context) -> Entry {
        Entry::Show(
            Form::modal("edutools.feedback.title")
                .field(Field::Slider {
                    label: "edutools.feedback.rating".into(),
                    min: 1.0,
                    max: 5.0,
                    step: 1.0,
                    default: 3.0,
                })
                .field(Field::TextField {
                    label: "edutools.feedback.comment".into(),
                    placeholder: "edutools.feedback.comment_hint".into(),
                    default: String::new(),
                }),
        )
    }

    fn resolve(&mut self, context: &mut Context, outcome: SceneOutcome) -> Transition {
        let actor = context.source_actor().clone();
        let event = match outcome {
            SceneOutcome::Confirmed(Response::Values(values)) => {
                let rating = values.first().and_then(Value::as_f64).unwrap_or_default();
                let comment = values.get(1).and_then(Value::as_str).unwrap_or_default().to_string();
                context.set("rating", rating);
                context.set("comment", comment.clone());
                FeedbackEvent::Submitted { actor, rating, comment }
            }
            SceneOutcome::Confirmed(_) | SceneOutcome::Cancelled => FeedbackEvent::Dismissed(actor),
            SceneOutcome::Busy => FeedbackEvent::Busy(actor),
        };
        self.state.borrow_mut().events.push(event);
        Transition::Close
    }
}

/// Handles of the installed feedback tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackTasks {
    /// Periodic prompt round
    pub round: TaskHandle,
    /// Per-tick processing of prompt outcomes
    pub outcomes: TaskHandle,
}

/// Register the prompt scene and schedule prompt rounds. Returns `None` when
/// disabled.
pub fn install<E, S>(
    config: &FeedbackPromptConfig,
    scheduler: &mut ConsoleScheduler<E, S>,
    navigation: &mut NavigationEngine<ConsolePresenter>,
) -> Option<FeedbackTasks>
where
    E: Environment + 'static,
    S: PropertyStore + 'static,
{
    if !config.enabled {
        return None;
    }

    let state = SharedState::default();
    let scene_state = state.clone();
    navigation.register_scene_requiring(config.scene.clone(), Requirements::none().target(), move |_| {
        FeedbackScene {
            state: scene_state.clone(),
        }
    });

    let round = {
        let state = state.clone();
        let scene = config.scene.clone();
        scheduler.schedule_periodic(config.interval, config.jitter, move |cx| {
            let due: Vec<ActorId> = {
                let state = state.borrow();
                let world = &*cx.world;
                world
                    .environment
                    .online_actors()
                    .into_iter()
                    .filter(|actor| !state.retrying.contains(actor))
                    .filter(|actor| world.navigation.current_scene(actor) != Some(&scene))
                    .collect()
            };
            for actor in due {
                if let Err(error) = prompt(cx.world, &actor, &scene) {
                    warn!(actor = %actor, %error, "feedback prompt failed");
                }
            }
            Ok(())
        })
    };

    let retry_delay = config.retry_delay;
    let scene = config.scene.clone();
    let outcomes = scheduler.schedule_periodic(1, 0, move |cx| {
        let events = std::mem::take(&mut state.borrow_mut().events);
        for event in events {
            match event {
                FeedbackEvent::Busy(actor) => {
                    if !state.borrow_mut().retrying.insert(actor.clone()) {
                        continue;
                    }
                    debug!(actor = %actor, retry_delay, "actor busy; re-arming feedback prompt");
                    let state = state.clone();
                    let scene = scene.clone();
                    cx.schedule_once(retry_delay, move |cx| {
                        state.borrow_mut().retrying.remove(&actor);
                        if cx.world.environment.is_online(&actor) {
                            prompt(cx.world, &actor, &scene)?;
                        }
                        Ok(())
                    });
                }
                FeedbackEvent::Submitted { actor, rating, comment } => {
                    match record(&mut cx.world.store, &actor, rating, &comment) {
                        Ok(()) => info!(actor = %actor, rating, "feedback recorded"),
                        Err(error) => warn!(actor = %actor, %error, "failed to record feedback"),
                    }
                    cx.world.release_helper(&actor);
                }
                FeedbackEvent::Dismissed(actor) => {
                    debug!(actor = %actor, "feedback prompt dismissed");
                    cx.world.release_helper(&actor);
                }
            }
        }
        Ok(())
    });

    Some(FeedbackTasks { round, outcomes })
}

/// Show `scene` to `actor` through their helper, spawning one if needed.
pub fn prompt<E: Environment, S: PropertyStore>(
    console: &mut Console<E, S>,
    actor: &ActorId,
    scene: &SceneId,
) -> edutools_navigation::Result<Navigation> {
    let helper = console.helper_for(actor);
    let context = Context::new(actor.clone()).with_target(EntityRef::new(helper.to_string()));
    let result = console.navigation.start_flow(context, scene.clone());
    if let Ok(Navigation::Displaying(_)) = &result {
        info!(actor = %actor, helper = %helper, "feedback prompt shown");
    }
    result
}

fn record<S: PropertyStore>(store: &mut S, actor: &ActorId, rating: f64, comment: &str) -> edutools_host::Result<()> {
    let mut store = ScopedStore::new(store, STORE_AREA);
    let responses: u64 = store.get(&format!("{actor}.responses"), 0);
    store.set(&format!("{actor}.responses"), &(responses + 1))?;
    store.set(&format!("{actor}.rating"), &rating)?;
    store.set(&format!("{actor}.comment"), &comment)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::testing::{console, run, scheduler, TestConsole, TestScheduler};
    use edutools_navigation::{DismissReason, FormResponse};
    use serde_json::json;

    fn config() -> FeedbackPromptConfig {
        FeedbackPromptConfig::default().with_interval(10, 0).with_retry_delay(5)
    }

    fn setup() -> (TestConsole, TestScheduler) {
        let mut console = console();
        let mut scheduler = scheduler();
        install(&config(), &mut scheduler, &mut console.navigation).unwrap();
        console.environment.join(ActorId::from("alex"));
        (console, scheduler)
    }

    fn answer(console: &mut TestConsole, response: FormResponse) -> Navigation {
        let alex = ActorId::from("alex");
        let (request, _) = console.navigation.presenter_mut().take(&alex).unwrap();
        console.navigation.deliver(&alex, request, response).unwrap()
    }

    fn prompt_open(console: &TestConsole) -> bool {
        console.navigation.presenter().open_form(&ActorId::from("alex")).is_some()
    }

    #[test]
    fn test_submission_is_stored_and_helper_released() {
        let (mut console, mut scheduler) = setup();
        run(&mut scheduler, &mut console, 9);
        assert!(!prompt_open(&console));
        run(&mut scheduler, &mut console, 1);
        assert!(prompt_open(&console));
        assert_eq!(console.environment.helpers().len(), 1);

        let result = answer(
            &mut console,
            FormResponse::Submitted(Response::Values(vec![json!(4), json!("more redstone")])),
        );
        assert_eq!(result, Navigation::Closed);
        run(&mut scheduler, &mut console, 1);

        assert_eq!(console.store.get("feedback.alex.rating", 0.0), 4.0);
        assert_eq!(console.store.get("feedback.alex.comment", String::new()), "more redstone");
        assert_eq!(console.store.get("feedback.alex.responses", 0u64), 1);
        assert!(console.environment.helpers().is_empty());
        assert!(console.helpers.is_empty());
    }

    #[test]
    fn test_busy_actor_is_retried() {
        let (mut console, mut scheduler) = setup();
        let alex = ActorId::from("alex");
        console.navigation.presenter_mut().set_occupied(&alex, true);

        run(&mut scheduler, &mut console, 10);
        assert!(!prompt_open(&console));
        assert_eq!(console.helpers.len(), 1);

        console.navigation.presenter_mut().set_occupied(&alex, false);
        run(&mut scheduler, &mut console, 4);
        assert!(!prompt_open(&console));
        run(&mut scheduler, &mut console, 1);
        assert!(prompt_open(&console));
        assert_eq!(console.environment.helpers().len(), 1);
    }

    #[test]
    fn test_deferred_busy_dismissal_is_retried() {
        let (mut console, mut scheduler) = setup();
        run(&mut scheduler, &mut console, 10);
        assert_eq!(answer(&mut console, FormResponse::Dismissed(DismissReason::UserBusy)), Navigation::Busy);

        run(&mut scheduler, &mut console, 6);
        assert!(prompt_open(&console));
    }

    #[test]
    fn test_dismissal_is_not_retried() {
        let (mut console, mut scheduler) = setup();
        run(&mut scheduler, &mut console, 10);
        assert_eq!(answer(&mut console, FormResponse::Dismissed(DismissReason::UserClosed)), Navigation::Closed);

        run(&mut scheduler, &mut console, 9);
        assert!(!prompt_open(&console));
        assert!(console.environment.helpers().is_empty());
        assert!(console.store.keys().is_empty());
    }

    #[test]
    fn test_open_prompt_is_not_duplicated() {
        let (mut console, mut scheduler) = setup();
        run(&mut scheduler, &mut console, 20);
        assert!(prompt_open(&console));
        assert_eq!(console.navigation.presenter_mut().drain_output().len(), 1);
    }
}
