//! Tick-driven task scheduler.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use edutools_core::Tick;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, warn};

use crate::config::SchedulerConfig;
use crate::job::{Job, JobInfo, Step};

/// Boxed task callback. Errors are logged by the scheduler and never
/// deregister the task.
pub type Callback<W> = Box<dyn FnMut(&mut TaskCx<'_, W>) -> anyhow::Result<()>>;

/// Cancel handle for a scheduled task or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// What a callback sees while it runs: the host world and the scheduler
/// itself, so it can arm or cancel further work.
pub struct TaskCx<'a, W> {
    /// The host world the scheduler drives
    pub world: &'a mut W,
    scheduler: &'a mut TaskScheduler<W>,
    handle: TaskHandle,
}

impl<'a, W: 'static> TaskCx<'a, W> {
    /// Handle of the task currently running.
    pub fn handle(&self) -> TaskHandle {
        self.handle
    }

    /// Current tick.
    pub fn now(&self) -> Tick {
        self.scheduler.now
    }

    /// The scheduler running this task.
    pub fn scheduler(&mut self) -> &mut TaskScheduler<W> {
        self.scheduler
    }

    /// See [`TaskScheduler::schedule_once`].
    pub fn schedule_once<F>(&mut self, delay: Tick, callback: F) -> TaskHandle
    where
        F: FnMut(&mut TaskCx<'_, W>) -> anyhow::Result<()> + 'static,
    {
        self.scheduler.schedule_once(delay, callback)
    }

    /// See [`TaskScheduler::run_chunked_job`].
    pub fn run_chunked_job(&mut self, job: impl Job<W> + 'static) -> TaskHandle {
        self.scheduler.run_chunked_job(job)
    }

    /// See [`TaskScheduler::cancel`].
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.scheduler.cancel(handle)
    }
}

enum Work<W> {
    Periodic { interval: Tick, callback: Callback<W> },
    Once(Callback<W>),
    Job(RunningJob<W>),
}

struct RunningJob<W> {
    job: Box<dyn Job<W>>,
    started_at: Tick,
    steps_run: u64,
}

struct Entry<W> {
    next_due: Tick,
    work: Work<W>,
}

/// Single-threaded scheduler driven by [`TaskScheduler::tick`].
///
/// `W` is whatever the host hands to callbacks each tick.
pub struct TaskScheduler<W> {
    now: Tick,
    next_handle: u64,
    entries: BTreeMap<TaskHandle, Entry<W>>,
    rng: StdRng,
    config: SchedulerConfig,
    running: Option<TaskHandle>,
    running_cancelled: bool,
}

impl<W: 'static> TaskScheduler<W> {
    /// Create a new scheduler.
    pub fn new(config: SchedulerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            now: 0,
            next_handle: 0,
            entries: BTreeMap::new(),
            rng,
            config,
            running: None,
            running_cancelled: false,
        }
    }

    /// Current tick.
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Number of live tasks and jobs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `handle` is still scheduled.
    pub fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.entries.contains_key(&handle) || (self.running == Some(handle) && !self.running_cancelled)
    }

    /// Run `callback` every `period + U(0, jitter_max)` ticks. The jitter is
    /// rolled once here and kept for the life of the task.
    pub fn schedule_periodic<F>(&mut self, period: Tick, jitter_max: Tick, callback: F) -> TaskHandle
    where
        F: FnMut(&mut TaskCx<'_, W>) -> anyhow::Result<()> + 'static,
    {
        let jitter = if jitter_max == 0 {
            0
        } else {
            self.rng.gen_range(0..=jitter_max)
        };
        let interval = period.max(1).saturating_add(jitter);
        let handle = self.allocate();
        debug!(%handle, period, jitter, "scheduled periodic task");
        self.entries.insert(
            handle,
            Entry {
                next_due: self.now.saturating_add(interval),
                work: Work::Periodic {
                    interval,
                    callback: Box::new(callback),
                },
            },
        );
        handle
    }

    /// Run `callback` once, `delay` ticks from now. A zero delay fires on the
    /// next tick.
    pub fn schedule_once<F>(&mut self, delay: Tick, callback: F) -> TaskHandle
    where
        F: FnMut(&mut TaskCx<'_, W>) -> anyhow::Result<()> + 'static,
    {
        let handle = self.allocate();
        debug!(%handle, delay, "scheduled one-shot task");
        self.entries.insert(
            handle,
            Entry {
                next_due: self.now.saturating_add(delay),
                work: Work::Once(Box::new(callback)),
            },
        );
        handle
    }

    /// Drive `job` across ticks, `steps_per_quantum` steps per tick, starting
    /// on the next tick.
    ///
    /// The scheduler does not deduplicate jobs. Callers that must not run two
    /// equivalent jobs hold a [`SingleFlight`](crate::SingleFlight) permit
    /// inside the job so the guard is released however the job ends.
    pub fn run_chunked_job(&mut self, job: impl Job<W> + 'static) -> TaskHandle {
        let handle = self.allocate();
        debug!(%handle, job = job.name(), "launched chunked job");
        self.entries.insert(
            handle,
            Entry {
                next_due: self.now,
                work: Work::Job(RunningJob {
                    job: Box::new(job),
                    started_at: self.now,
                    steps_run: 0,
                }),
            },
        );
        handle
    }

    /// Cancel a task or job. Unknown, fired, or already cancelled handles are
    /// a no-op. Returns whether anything was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        if self.entries.remove(&handle).is_some() {
            debug!(%handle, "cancelled task");
            return true;
        }
        if self.running == Some(handle) && !self.running_cancelled {
            self.running_cancelled = true;
            debug!(%handle, "cancelled running task");
            return true;
        }
        false
    }

    /// Progress of a running job.
    pub fn job_info(&self, handle: TaskHandle) -> Option<JobInfo> {
        match &self.entries.get(&handle)?.work {
            Work::Job(running) => Some(JobInfo {
                name: running.job.name().to_string(),
                started_at: running.started_at,
                steps_run: running.steps_run,
            }),
            _ => None,
        }
    }

    /// Advance one tick and run everything that is due. Returns how many
    /// tasks and jobs ran.
    pub fn tick(&mut self, world: &mut W) -> usize {
        self.now += 1;
        let now = self.now;

        let mut due: Vec<(Tick, TaskHandle)> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.next_due <= now)
            .map(|(handle, entry)| (entry.next_due, *handle))
            .collect();
        due.sort_unstable();

        let mut ran = 0;
        for (_, handle) in due {
            // An earlier callback this tick may have cancelled it.
            let Some(mut entry) = self.entries.remove(&handle) else {
                continue;
            };
            self.running = Some(handle);
            self.running_cancelled = false;
            ran += 1;

            let keep = match &mut entry.work {
                Work::Periodic { interval, callback } => {
                    self.invoke(world, handle, callback);
                    entry.next_due = now.saturating_add(*interval);
                    true
                }
                Work::Once(callback) => {
                    self.invoke(world, handle, callback);
                    false
                }
                Work::Job(running) => {
                    entry.next_due = now.saturating_add(1);
                    self.advance_job(world, handle, running)
                }
            };

            if keep && !self.running_cancelled {
                self.entries.insert(handle, entry);
            }
            self.running = None;
            self.running_cancelled = false;
        }
        ran
    }

    fn allocate(&mut self) -> TaskHandle {
        self.next_handle += 1;
        TaskHandle(self.next_handle)
    }

    fn invoke(&mut self, world: &mut W, handle: TaskHandle, callback: &mut Callback<W>) {
        let mut cx = TaskCx {
            world,
            scheduler: self,
            handle,
        };
        match panic::catch_unwind(AssertUnwindSafe(|| callback(&mut cx))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(%handle, error = %e, "task callback failed"),
            Err(payload) => error!(%handle, panic = %panic_message(&*payload), "task callback panicked"),
        }
    }

    /// Returns whether the job should be resumed next tick.
    fn advance_job(&mut self, world: &mut W, handle: TaskHandle, running: &mut RunningJob<W>) -> bool {
        for _ in 0..self.config.steps_per_quantum.max(1) {
            let mut cx = TaskCx {
                world: &mut *world,
                scheduler: &mut *self,
                handle,
            };
            let job = &mut running.job;
            let result = panic::catch_unwind(AssertUnwindSafe(|| job.step(&mut cx)));
            running.steps_run += 1;
            match result {
                Ok(Ok(Step::Continue)) => {
                    if self.running_cancelled {
                        return false;
                    }
                }
                Ok(Ok(Step::Done)) => {
                    debug!(%handle, job = running.job.name(), steps = running.steps_run, "job finished");
                    return false;
                }
                Ok(Err(e)) => {
                    warn!(%handle, job = running.job.name(), step = running.steps_run, error = %e, "job step failed");
                    return false;
                }
                Err(payload) => {
                    error!(
                        %handle,
                        job = running.job.name(),
                        step = running.steps_run,
                        panic = %panic_message(&*payload),
                        "job step panicked"
                    );
                    return false;
                }
            }
        }
        true
    }
}

impl<W: 'static> Default for TaskScheduler<W> {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
