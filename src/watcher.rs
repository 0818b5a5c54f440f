//! Background watcher lifecycle.
//!
//! The watcher is either `Idle` or `Active`. Transitions happen under one
//! mutex, so concurrent enable/disable calls cannot double-start the thread.
//! Stopping raises a [`StopSignal`] and joins the thread before returning.

use crate::error::panic_message;
use parking_lot::{Condvar, Mutex};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag with an interruptible sleep.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    cvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop and wake it if it is sleeping.
    pub fn request(&self) {
        *self.stopped.lock() = true;
        self.cvar.notify_all();
    }

    pub fn is_requested(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for up to `timeout`. Returns `true` if stop was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.cvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

enum WatcherState {
    Idle,
    Active {
        stop: Arc<StopSignal>,
        handle: JoinHandle<()>,
    },
}

/// Owns at most one polling thread.
pub struct Watcher {
    thread_name: String,
    state: Mutex<WatcherState>,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("thread_name", &self.thread_name)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Watcher {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            state: Mutex::new(WatcherState::Idle),
        }
    }

    /// Whether a polling thread is running. A thread that has exited on its
    /// own is reaped and reported as idle.
    pub fn is_active(&self) -> bool {
        let mut state = self.state.lock();
        reap_finished(&mut state);
        matches!(*state, WatcherState::Active { .. })
    }

    /// Start the polling thread.
    ///
    /// The thread checks for stop, runs `tick`, then sleeps for `interval()`
    /// (re-read every cycle) until stopped. A panicking tick is logged and
    /// the loop carries on. Returns `Ok(false)` if the watcher was already
    /// active.
    pub fn start<T, I>(&self, mut tick: T, interval: I) -> std::io::Result<bool>
    where
        T: FnMut() + Send + 'static,
        I: Fn() -> Duration + Send + 'static,
    {
        let mut state = self.state.lock();
        reap_finished(&mut state);
        if matches!(*state, WatcherState::Active { .. }) {
            return Ok(false);
        }

        let stop = Arc::new(StopSignal::new());
        let worker_stop = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                log::debug!("Shader watcher thread started");
                while !worker_stop.is_requested() {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(&mut tick)) {
                        log::error!(
                            "Shader watcher tick panicked: {}",
                            panic_message(payload.as_ref())
                        );
                    }
                    if worker_stop.wait_timeout(interval()) {
                        break;
                    }
                }
                log::debug!("Shader watcher thread exiting");
            })?;

        *state = WatcherState::Active { stop, handle };
        Ok(true)
    }

    /// Stop the polling thread and wait for it to exit.
    ///
    /// Returns `false` if the watcher was already idle.
    pub fn stop(&self) -> bool {
        let mut state = self.state.lock();
        reap_finished(&mut state);
        match std::mem::replace(&mut *state, WatcherState::Idle) {
            WatcherState::Idle => false,
            WatcherState::Active { stop, handle } => {
                stop.request();
                join_worker(handle);
                true
            }
        }
    }
}

/// Move an `Active` state whose thread already exited back to `Idle`.
fn reap_finished(state: &mut WatcherState) {
    let finished = matches!(state, WatcherState::Active { handle, .. } if handle.is_finished());
    if !finished {
        return;
    }
    if let WatcherState::Active { handle, .. } = std::mem::replace(state, WatcherState::Idle) {
        log::warn!("Shader watcher thread exited without being stopped");
        join_worker(handle);
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if let Err(payload) = handle.join() {
        log::error!(
            "Shader watcher thread panicked: {}",
            panic_message(payload.as_ref())
        );
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.stop();
    }
}
