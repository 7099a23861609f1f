use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cooperative shutdown flag shared between the main loop and its worker threads.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct Coordinator {
    stop: Arc<AtomicBool>,
    reason: Arc<Mutex<Option<String>>>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("should_stop", &self.should_stop())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks all participants to stop. The first reason given is kept.
    pub fn request_stop(&self, reason: impl Into<String>) {
        if let Ok(mut slot) = self.reason.lock() {
            slot.get_or_insert_with(|| reason.into());
        }
        self.stop.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn stop_reason(&self) -> Option<String> {
        self.reason.lock().ok().and_then(|r| r.clone())
    }
}
