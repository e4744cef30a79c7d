use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// One-shot broadcast that a connection is shutting down.
///
/// Clones share state. Only the owning connection can fire it; the flag
/// flips under the mutex, so exactly one caller observes the transition.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` only for the call that fired it.
    pub(crate) fn trigger(&self) -> bool {
        let (_, cvar) = &*self.inner;
        let mut fired = self.flag();
        if *fired {
            return false;
        }
        *fired = true;
        cvar.notify_all();
        true
    }

    pub fn is_triggered(&self) -> bool {
        *self.flag()
    }

    /// Block until the signal fires.
    pub fn wait(&self) {
        let (_, cvar) = &*self.inner;
        let mut fired = self.flag();
        while !*fired {
            fired = cvar.wait(fired).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the signal fires or `timeout` elapses. Returns whether it
    /// fired.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (_, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut fired = self.flag();
        while !*fired {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            fired = cvar
                .wait_timeout(fired, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
