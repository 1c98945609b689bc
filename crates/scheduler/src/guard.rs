//! Single-flight guard for equivalent background work.
//!
//! The guard belongs to the mechanic that launches the work, not to the
//! scheduler. A [`FlightPermit`] releases the guard when dropped, so a job that
//! owns its permit frees the guard whether it completes, fails, or is
//! cancelled. [`SingleFlight::reset`] is the manual escape hatch for callers
//! that need to clear a guard they no longer trust.

use std::cell::Cell;
use std::rc::Rc;

/// Caller-owned "already running" flag.
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    state: Rc<FlightState>,
}

#[derive(Debug, Default)]
struct FlightState {
    // Generation of the permit currently holding the guard.
    holder: Cell<Option<u64>>,
    generation: Cell<u64>,
}

impl SingleFlight {
    /// Create a released guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard if nobody holds it.
    pub fn try_acquire(&self) -> Option<FlightPermit> {
        if self.state.holder.get().is_some() {
            return None;
        }
        let generation = self.state.generation.get() + 1;
        self.state.generation.set(generation);
        self.state.holder.set(Some(generation));
        Some(FlightPermit {
            state: Rc::clone(&self.state),
            generation,
        })
    }

    /// Whether the guard is currently held.
    pub fn is_held(&self) -> bool {
        self.state.holder.get().is_some()
    }

    /// Force-release the guard. An outstanding permit becomes inert.
    pub fn reset(&self) {
        self.state.holder.set(None);
    }
}

/// Proof of holding a [`SingleFlight`] guard.
#[derive(Debug)]
pub struct FlightPermit {
    state: Rc<FlightState>,
    generation: u64,
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        // A stale permit must not release a newer holder.
        if self.state.holder.get() == Some(self.generation) {
            self.state.holder.set(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let guard = SingleFlight::new();
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.try_acquire().is_none());
        assert!(guard.is_held());
    }

    #[test]
    fn test_drop_releases() {
        let guard = SingleFlight::new();
        {
            let _permit = guard.try_acquire().unwrap();
        }
        assert!(!guard.is_held());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_stale_permit_does_not_release_new_holder() {
        let guard = SingleFlight::new();
        let stale = guard.try_acquire().unwrap();
        guard.reset();
        let fresh = guard.try_acquire().unwrap();
        drop(stale);
        assert!(guard.is_held());
        drop(fresh);
        assert!(!guard.is_held());
    }
}
