//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunPhase`: the phase a run is in, with the allowed transitions
//! - `RunTracker`: the phase of a live run plus guarded transitions

mod run_phase;

pub use run_phase::RunPhase;

use crate::HarvestError;

/// Holds the phase of a run and refuses invalid transitions
#[derive(Debug, Clone)]
pub struct RunTracker {
    phase: RunPhase,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::resume(RunPhase::Idle)
    }

    /// Continues tracking from a phase recorded earlier
    pub fn resume(phase: RunPhase) -> Self {
        Self { phase }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Moves to `next`, or fails with `InvalidTransition`
    pub fn transition(&mut self, next: RunPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }

        tracing::trace!("Run phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}
