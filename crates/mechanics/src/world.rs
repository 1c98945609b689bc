//! The world handed to every scheduled mechanic.

use edutools_core::{ActorId, HelperId};
use edutools_host::{ConsolePresenter, Environment, PropertyStore};
use edutools_links::LinkRegistry;
use edutools_navigation::NavigationEngine;
use edutools_scheduler::TaskScheduler;
use tracing::info;

/// Everything the mechanics share: navigation, the environment, settings and
/// the actor-to-helper links.
///
/// Fields are public so a task can borrow them independently.
pub struct Console<E: Environment, S: PropertyStore> {
    /// Navigation engine
    pub navigation: NavigationEngine<ConsolePresenter>,
    /// Simulated or real environment
    pub environment: E,
    /// Settings store
    pub store: S,
    /// Which helper belongs to which actor
    pub helpers: LinkRegistry<ActorId, HelperId>,
}

/// Scheduler driving a [`Console`].
pub type ConsoleScheduler<E, S> = TaskScheduler<Console<E, S>>;

impl<E: Environment, S: PropertyStore> Console<E, S> {
    /// Assemble a console world.
    pub fn new(navigation: NavigationEngine<ConsolePresenter>, environment: E, store: S) -> Self {
        Self {
            navigation,
            environment,
            store,
            helpers: LinkRegistry::new(),
        }
    }

    /// Drop the actor's navigation session and open form. Its helper stays
    /// linked until the next sweep.
    pub fn disconnect(&mut self, actor: &ActorId) {
        self.navigation.end_session(actor);
        self.navigation.presenter_mut().forget(actor);
        info!(actor = %actor, "actor disconnected");
    }

    /// The actor's linked helper, spawning and linking one if it has none or
    /// the linked one no longer exists.
    pub fn helper_for(&mut self, actor: &ActorId) -> HelperId {
        if let Some(helper) = self.helpers.lookup_by_key(actor) {
            if self.environment.helper_owner(helper).is_some() {
                return helper.clone();
            }
        }
        let helper = self.environment.spawn_helper(actor);
        self.helpers.link(actor.clone(), helper.clone());
        helper
    }

    /// Unlink and remove the actor's helper, if any.
    pub fn release_helper(&mut self, actor: &ActorId) -> Option<HelperId> {
        let helper = self.helpers.unlink_by_key(actor)?;
        self.environment.despawn_helper(&helper);
        Some(helper)
    }
}
