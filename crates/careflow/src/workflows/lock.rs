use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::error::WorkflowError;

const ACQUIRE_BACKOFF: Duration = Duration::from_millis(2);

/// Per-entity serialization locks with a bounded acquisition wait.
///
/// Transitions for one submission or dispute id must not interleave; a
/// caller that cannot take the slot before the deadline gets `Busy` instead
/// of blocking indefinitely.
pub struct EntityLocks {
    slots: Mutex<HashMap<String, Arc<AtomicBool>>>,
    wait: Duration,
}

impl EntityLocks {
    pub fn new(wait: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            wait,
        }
    }

    /// Acquire the exclusive guard for `key`, waiting at most the
    /// configured bound.
    pub fn acquire(&self, key: &str) -> Result<EntityGuard, WorkflowError> {
        let slot = {
            let mut slots = self.slots.lock().expect("lock registry mutex poisoned");
            slots.entry(key.to_string()).or_default().clone()
        };

        let deadline = Instant::now() + self.wait;
        loop {
            if slot
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(EntityGuard { slot });
            }
            if Instant::now() >= deadline {
                return Err(WorkflowError::Busy);
            }
            thread::sleep(ACQUIRE_BACKOFF);
        }
    }
}

impl Default for EntityLocks {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

/// Exclusive hold on one entity id. Released on drop.
pub struct EntityGuard {
    slot: Arc<AtomicBool>,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}
