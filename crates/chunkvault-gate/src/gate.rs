use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// AdmissionGate
// ---------------------------------------------------------------------------

/// A counting gate with a fixed ceiling and no wait queue.
///
/// Acquisition is a poll: it either takes a permit immediately or fails
/// immediately. Callers that fail are expected to shed the request.
#[derive(Debug)]
pub struct AdmissionGate {
    limit: usize,
    in_use: AtomicUsize,
}

impl AdmissionGate {
    /// Create a gate admitting at most `limit` concurrent holders.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            in_use: AtomicUsize::new(0),
        }
    }

    /// The fixed ceiling.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits currently held.
    pub fn in_use(&self) -> usize {
        self.in_use.load(Ordering::Acquire)
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.in_use())
    }

    /// Take one permit without blocking. Returns `false` at capacity.
    ///
    /// Every `true` must be paired with exactly one [`Self::release`].
    /// Prefer [`Self::try_permit`], which pairs them automatically.
    pub fn try_acquire(&self) -> bool {
        self.in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }

    /// Return one permit taken by [`Self::try_acquire`].
    pub fn release(&self) {
        let prev = self
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        debug_assert!(prev.is_ok(), "release without matching acquire");
    }

    /// Take one permit as a guard that releases it when dropped.
    pub fn try_permit(self: &Arc<Self>) -> Option<Permit> {
        self.try_acquire().then(|| Permit {
            gate: Arc::clone(self),
        })
    }
}

// ---------------------------------------------------------------------------
// Permit
// ---------------------------------------------------------------------------

/// A held admission permit.
///
/// Dropping the permit releases it, which covers normal completion, early
/// returns, panics, and futures dropped on cancellation alike.
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit {
    gate: Arc<AdmissionGate>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
