//! Degraded-mode switch shared by the adapter's components.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the adapter's transport is usable.
///
/// Starts available; once degraded it stays degraded.
#[derive(Debug, Clone)]
pub struct Availability(Arc<AtomicBool>);

impl Availability {
    /// Available transport.
    #[must_use]
    pub fn available() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Transport that was never usable.
    #[must_use]
    pub fn degraded() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Returns `true` while the transport is usable.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Switches to degraded mode. Returns `true` if this call did the switch.
    pub fn degrade(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}
