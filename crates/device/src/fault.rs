//! One-shot failure injection for exercising error paths.

use std::sync::atomic::{AtomicUsize, Ordering};

const DISARMED: usize = usize::MAX;

/// Operation kinds that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Alloc,
    Upload,
    Launch,
}

pub(crate) struct FaultPlan {
    countdown: [AtomicUsize; 3],
}

impl Default for FaultPlan {
    fn default() -> Self {
        Self {
            countdown: [const { AtomicUsize::new(DISARMED) }; 3],
        }
    }
}

impl FaultPlan {
    pub(crate) fn arm(&self, fault: Fault, after: usize) {
        // `after == DISARMED` would never fire; clamp it.
        self.countdown[fault as usize].store(after.min(DISARMED - 1), Ordering::Release);
    }

    /// Count one operation of kind `fault`; true if it must fail.
    pub(crate) fn trip(&self, fault: Fault) -> bool {
        let slot = &self.countdown[fault as usize];
        let previous = slot.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match n {
            DISARMED => None,
            0 => Some(DISARMED),
            n => Some(n - 1),
        });
        previous == Ok(0)
    }
}
