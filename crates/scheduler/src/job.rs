//! Chunked, resumable jobs.

use edutools_core::Tick;

use crate::scheduler::TaskCx;

/// What a job step reports back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains; call `step` again.
    Continue,
    /// The job is finished.
    Done,
}

/// A unit of work split into steps.
///
/// Each call to [`Job::step`] must do a bounded amount of work (one inventory
/// slot, one entity). The scheduler calls it at most
/// `steps_per_quantum` times per tick and resumes on the next tick.
pub trait Job<W> {
    /// Name used in logs.
    fn name(&self) -> &str {
        "job"
    }

    /// Perform one logical unit of work.
    fn step(&mut self, cx: &mut TaskCx<'_, W>) -> anyhow::Result<Step>;
}

/// Job built from a closure, see [`from_fn`].
pub struct FnJob<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named [`Job`].
pub fn from_fn<W, F>(name: impl Into<String>, f: F) -> FnJob<F>
where
    F: FnMut(&mut TaskCx<'_, W>) -> anyhow::Result<Step>,
{
    FnJob {
        name: name.into(),
        f,
    }
}

impl<W, F> Job<W> for FnJob<F>
where
    F: FnMut(&mut TaskCx<'_, W>) -> anyhow::Result<Step>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, cx: &mut TaskCx<'_, W>) -> anyhow::Result<Step> {
        (self.f)(cx)
    }
}

/// Progress snapshot of a running job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    /// Job name
    pub name: String,
    /// Tick the job was launched
    pub started_at: Tick,
    /// Steps executed so far
    pub steps_run: u64,
}
