//! Listener lifecycle: Serving -> Draining -> Closed
//!
//! The server starts in `Serving`. The first shutdown signal moves it to
//! `Draining`: the listener stops accepting, new publishes are refused and
//! in-flight requests get a grace period. Once they are done (or the grace
//! period is over) the broker connection is released and the state becomes
//! `Closed`. Each transition happens at most once.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Serving,
    Draining,
    Closed,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Serving,
            1 => Phase::Draining,
            _ => Phase::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Phase::Serving => 0,
            Phase::Draining => 1,
            Phase::Closed => 2,
        }
    }
}

/// Shared lifecycle phase, cloned into every handler
#[derive(Debug, Clone)]
pub struct LifecycleState {
    phase: Arc<AtomicU8>,
}

impl LifecycleState {
    /// Create a new lifecycle in the `Serving` phase
    pub fn new() -> Self {
        Self {
            phase: Arc::new(AtomicU8::new(Phase::Serving.as_u8())),
        }
    }

    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// True once draining has begun
    pub fn is_draining(&self) -> bool {
        self.phase() != Phase::Serving
    }

    /// Serving -> Draining. Returns false if draining had already begun.
    pub fn begin_draining(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Serving.as_u8(),
                Phase::Draining.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Move to the terminal phase. Returns true only the first time.
    pub fn mark_closed(&self) -> bool {
        self.phase.swap(Phase::Closed.as_u8(), Ordering::SeqCst) != Phase::Closed.as_u8()
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}
