//! Phase Budget Enforcement
//!
//! Each long pipeline phase (lattice enumeration, GA evolution, the
//! benchmark miners) runs under a wall-clock budget with cooperative
//! cancellation. A phase checks its budget at iteration boundaries; on
//! overrun it stops and returns the best artifact produced so far rather
//! than failing the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Budget controller for one pipeline phase.
///
/// Shared across threads; checked periodically by the phase body.
#[derive(Clone)]
pub struct PhaseBudget {
    /// Cancellation flag (shared across threads)
    cancelled: Arc<AtomicBool>,

    /// When the phase started
    started: Instant,

    /// Maximum allowed duration, if any
    limit: Option<Duration>,
}

impl PhaseBudget {
    /// Create a controller with the given wall-clock limit
    pub fn new(limit: Option<Duration>) -> Self {
        PhaseBudget {
            cancelled: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
            limit,
        }
    }

    /// Create a controller with no limit
    pub fn unlimited() -> Self {
        PhaseBudget::new(None)
    }

    /// Create a controller from a seconds value where 0 means unlimited
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            PhaseBudget::unlimited()
        } else {
            PhaseBudget::new(Some(Duration::from_secs(secs)))
        }
    }

    /// True once the phase has been cancelled or has run past its limit.
    ///
    /// Call at iteration boundaries. The first overrun latches the
    /// cancellation flag so later calls stay exhausted.
    pub fn exhausted(&self) -> bool {
        if self.cancelled.load(Ordering::Relaxed) {
            return true;
        }
        if let Some(limit) = self.limit {
            if self.started.elapsed() > limit {
                self.cancelled.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Cancel the phase explicitly
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Time spent since the phase started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Handle for cancelling the phase from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

/// Handle for cancelling a phase from another thread
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the associated phase
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}
