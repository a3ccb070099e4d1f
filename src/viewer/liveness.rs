use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "still mounted" flag.
///
/// Asynchronous work started by a presentation mode holds a clone and drops
/// its result once the mode has been torn down.
#[derive(Debug, Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Idempotent; every clone observes it.
    pub fn revoke(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Whether `other` is a clone of this flag.
    pub fn same_as(&self, other: &Liveness) -> bool {
        Arc::ptr_eq(&self.alive, &other.alive)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}
