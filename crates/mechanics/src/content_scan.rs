//! Restricted content scan.
//!
//! A periodic task launches a chunked job that walks every online actor's
//! inventory one slot per step and clears items matching the configured
//! patterns. The job carries the scan's single-flight permit, so the next
//! launch is possible as soon as the job finishes, fails, or is cancelled by
//! its failsafe.

use std::rc::Rc;

use edutools_core::{ActorId, Tick};
use edutools_host::{Environment, PropertyStore, ScopedStore};
use edutools_scheduler::{FlightPermit, Job, SingleFlight, Step, TaskCx, TaskHandle};
use regex::RegexSet;
use tracing::{debug, info, warn};

use crate::config::ContentScanConfig;
use crate::world::{Console, ConsoleScheduler};

/// Property store area for removal counters.
pub const STORE_AREA: &str = "content_scan";

/// One pass over all online inventories.
pub struct ScanJob {
    _permit: FlightPermit,
    patterns: Rc<RegexSet>,
    actors: Vec<ActorId>,
    actor: usize,
    slot: usize,
    removed: usize,
}

impl ScanJob {
    fn new(permit: FlightPermit, patterns: Rc<RegexSet>, actors: Vec<ActorId>) -> Self {
        Self {
            _permit: permit,
            patterns,
            actors,
            actor: 0,
            slot: 0,
            removed: 0,
        }
    }
}

impl<E: Environment, S: PropertyStore> Job<Console<E, S>> for ScanJob {
    fn name(&self) -> &str {
        "content_scan"
    }

    fn step(&mut self, cx: &mut TaskCx<'_, Console<E, S>>) -> anyhow::Result<Step> {
        let Some(actor) = self.actors.get(self.actor) else {
            debug!(actors = self.actors.len(), removed = self.removed, "content scan finished");
            return Ok(Step::Done);
        };

        let world = &mut *cx.world;
        if self.slot >= world.environment.inventory_size(actor) {
            self.actor += 1;
            self.slot = 0;
            return Ok(Step::Continue);
        }

        let slot = self.slot;
        self.slot += 1;
        let Some(item) = world.environment.inventory_slot(actor, slot) else {
            return Ok(Step::Continue);
        };
        if self.patterns.is_match(&item) {
            world.environment.clear_slot(actor, slot);
            self.removed += 1;
            info!(actor = %actor, slot, item = %item, "removed restricted item");

            let mut store = ScopedStore::new(&mut world.store, STORE_AREA);
            let key = format!("{actor}.removed");
            let removed: u64 = store.get(&key, 0);
            store.set(&key, &(removed + 1))?;
        }
        Ok(Step::Continue)
    }
}

/// Handles of the installed scan.
#[derive(Debug, Clone)]
pub struct ContentScanTasks {
    /// Periodic launcher
    pub launcher: TaskHandle,
    /// Guard held while a scan job is alive
    pub guard: SingleFlight,
}

/// Schedule scan launches. Returns `Ok(None)` when disabled and an error if a
/// pattern does not compile.
pub fn install<E, S>(
    config: &ContentScanConfig,
    scheduler: &mut ConsoleScheduler<E, S>,
) -> Result<Option<ContentScanTasks>, regex::Error>
where
    E: Environment + 'static,
    S: PropertyStore + 'static,
{
    if !config.enabled {
        return Ok(None);
    }

    let patterns = Rc::new(RegexSet::new(&config.patterns)?);
    let guard = SingleFlight::new();
    let launcher_guard = guard.clone();
    let max_job_ticks = config.max_job_ticks;
    let launcher = scheduler.schedule_periodic(config.period, config.jitter, move |cx| {
        launch(cx, &launcher_guard, &patterns, max_job_ticks);
        Ok(())
    });

    Ok(Some(ContentScanTasks { launcher, guard }))
}

/// Start a scan unless one is running, with a failsafe that cancels it after
/// `max_job_ticks`.
fn launch<E, S>(
    cx: &mut TaskCx<'_, Console<E, S>>,
    guard: &SingleFlight,
    patterns: &Rc<RegexSet>,
    max_job_ticks: Tick,
) -> Option<TaskHandle>
where
    E: Environment + 'static,
    S: PropertyStore + 'static,
{
    let Some(permit) = guard.try_acquire() else {
        debug!("content scan still running; skipping launch");
        return None;
    };

    let actors = cx.world.environment.online_actors();
    let job = cx.run_chunked_job(ScanJob::new(permit, Rc::clone(patterns), actors));
    cx.schedule_once(max_job_ticks, move |cx| {
        if cx.cancel(job) {
            warn!(job = %job, max_job_ticks, "content scan overran; cancelled");
        }
        Ok(())
    });
    Some(job)
}
