//! Startup/shutdown lifecycle gates shared between a jack's constructor and
//! its background thread(s): `init_done`, `ready_to_route`,
//! `closed_and_cleaned`.

use std::sync::{Condvar, Mutex};

#[derive(Default)]
struct State {
    init_done: bool,
    ready_to_route: bool,
    closed_and_cleaned: bool,
}

/// Three booleans plus the condvar that wakes waiters when one flips.
/// `route()` blocks on `ready_to_route`; `close()` blocks on
/// `closed_and_cleaned`.
pub struct Readiness {
    state: Mutex<State>,
    changed: Condvar,
}

impl Default for Readiness {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            changed: Condvar::new(),
        }
    }
}

impl Readiness {
    /// A readiness gate with nothing yet signaled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        #[allow(clippy::expect_used, reason = "readiness mutex is never held across a panic")]
        self.state.lock().expect("readiness mutex poisoned")
    }

    /// Mark the socket bound and the jack's own fields initialized.
    pub fn mark_init_done(&self) {
        self.lock().init_done = true;
        self.changed.notify_all();
    }

    /// `true` once [`Readiness::mark_init_done`] has run.
    #[must_use]
    pub fn init_done(&self) -> bool {
        self.lock().init_done
    }

    /// Mark the background read/accept loop running and able to serve
    /// `route()` calls.
    pub fn mark_ready_to_route(&self) {
        self.lock().ready_to_route = true;
        self.changed.notify_all();
    }

    /// Mark the jack's background threads joined and its socket released.
    pub fn mark_closed_and_cleaned(&self) {
        let mut state = self.lock();
        state.ready_to_route = false;
        state.closed_and_cleaned = true;
        self.changed.notify_all();
    }

    /// `true` once [`Readiness::mark_closed_and_cleaned`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed_and_cleaned
    }

    /// Blocks until `ready_to_route` or `closed_and_cleaned` is set;
    /// returns whether the jack is actually ready (`false` means it was
    /// closed before ever becoming ready).
    #[must_use]
    pub fn wait_ready_to_route(&self) -> bool {
        let guard = self.lock();
        #[allow(clippy::expect_used, reason = "readiness mutex is never held across a panic")]
        let guard = self
            .changed
            .wait_while(guard, |s| !s.ready_to_route && !s.closed_and_cleaned)
            .expect("readiness mutex poisoned");
        guard.ready_to_route
    }

    /// Blocks until `closed_and_cleaned` is set.
    pub fn wait_closed_and_cleaned(&self) {
        let guard = self.lock();
        #[allow(clippy::expect_used, reason = "readiness mutex is never held across a panic")]
        let _guard = self
            .changed
            .wait_while(guard, |s| !s.closed_and_cleaned)
            .expect("readiness mutex poisoned");
    }
}
