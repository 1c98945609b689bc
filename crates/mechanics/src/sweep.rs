//! Periodic reclamation of helpers whose actor is gone.

use edutools_host::{Environment, PropertyStore};
use edutools_scheduler::TaskHandle;
use tracing::{debug, info, warn};

use crate::config::HelperSweepConfig;
use crate::world::{Console, ConsoleScheduler};

/// Result of one sweep pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Pairs unlinked because their actor went offline
    pub unlinked: usize,
    /// Helpers destroyed because nothing linked to them
    pub destroyed: usize,
}

/// Unlink offline actors, then destroy every live helper no actor links to.
pub fn sweep_helpers<E: Environment, S: PropertyStore>(console: &mut Console<E, S>) -> SweepReport {
    let Console {
        environment, helpers, ..
    } = console;

    let unlinked = helpers.retain_keys(|actor| environment.is_online(actor));
    for (actor, helper) in &unlinked {
        debug!(actor = %actor, helper = %helper, "unlinked helper of offline actor");
    }

    let mut destroyed = 0;
    for helper in helpers.orphans(environment.helpers()) {
        let owner = environment.helper_owner(&helper);
        if environment.despawn_helper(&helper) {
            destroyed += 1;
            info!(helper = %helper, owner = ?owner, "destroyed orphaned helper");
        } else {
            warn!(helper = %helper, owner = ?owner, "orphaned helper could not be destroyed");
        }
    }

    SweepReport {
        unlinked: unlinked.len(),
        destroyed,
    }
}

/// Schedule [`sweep_helpers`]. Returns `None` when disabled.
pub fn install<E, S>(scheduler: &mut ConsoleScheduler<E, S>, config: &HelperSweepConfig) -> Option<TaskHandle>
where
    E: Environment + 'static,
    S: PropertyStore + 'static,
{
    if !config.enabled {
        return None;
    }
    Some(scheduler.schedule_periodic(config.period, config.jitter, |cx| {
        let report = sweep_helpers(cx.world);
        if report != SweepReport::default() {
            debug!(unlinked = report.unlinked, destroyed = report.destroyed, "helper sweep");
        }
        Ok(())
    }))
}
