//! # Process-wide terminating latch.
//!
//! [`TerminatingFlag`] starts cleared and is tripped exactly once, by the first
//! shutdown path (`Supervisor::stop_all` or the coordinator). Worker actors read it
//! at every restart decision point: right after an exit and again when the restart
//! timer fires. Once set it never reverts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared one-way boolean latch.
///
/// Cheap to clone; all clones observe the same state.
#[derive(Clone, Debug, Default)]
pub struct TerminatingFlag(Arc<AtomicBool>);

impl TerminatingFlag {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Returns `true` only for the call that actually flipped it.
    pub fn trip(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    /// True once shutdown has begun.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
