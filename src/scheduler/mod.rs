//! One independent periodic task per dashboard source.
//!
//! Each source gets its own thread: an initial refresh on startup, then
//! an infinite wait-refresh loop. Tasks never communicate; a failure in
//! one source's cycle is logged to that source's stream and cannot touch
//! another task's timer.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::logging::Logger;
use crate::sources::DashboardSource;

/// Delay between consecutive task launches, purely to avoid a
/// thundering-herd of startup log writes.
const STARTUP_STAGGER: Duration = Duration::from_millis(500);

/// Shared cancellation flag with a timed wait, cloneable into every task.
#[derive(Clone, Default)]
pub struct Shutdown {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (lock, cvar) = &*self.state;
        if let Ok(mut triggered) = lock.lock() {
            *triggered = true;
        }
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        let (lock, _) = &*self.state;
        lock.lock().map(|t| *t).unwrap_or(true)
    }

    /// Wait out `timeout` or until shutdown triggers, whichever is first.
    /// `Ok(true)` means shutdown; `Err(())` means the wait construct
    /// itself is broken (poisoned lock) and the caller must stop.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool, ()> {
        let (lock, cvar) = &*self.state;
        let deadline = Instant::now() + timeout;

        let mut triggered = lock.lock().map_err(|_| ())?;
        while !*triggered {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let (guard, wait) = cvar
                .wait_timeout(triggered, deadline - now)
                .map_err(|_| ())?;
            triggered = guard;
            if wait.timed_out() {
                return Ok(*triggered);
            }
        }
        Ok(true)
    }
}

pub struct Scheduler {
    logger: Logger,
    shutdown: Shutdown,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            shutdown: Shutdown::new(),
            handles: Vec::new(),
        }
    }

    /// A handle other threads can use to stop every task.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Launch one task for `source`. Spawning never blocks; the startup
    /// stagger happens inside the task thread.
    pub fn spawn(&mut self, source: Box<dyn DashboardSource>) {
        let logger = self.logger.clone();
        let shutdown = self.shutdown.clone();
        let stagger = STARTUP_STAGGER * self.handles.len() as u32;

        self.handles
            .push(thread::spawn(move || run_task(source, logger, shutdown, stagger)));
    }

    /// Block until every task stops. In normal operation tasks never
    /// stop, so this parks the main thread for the process lifetime.
    pub fn join(self) {
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn run_task(source: Box<dyn DashboardSource>, logger: Logger, shutdown: Shutdown, stagger: Duration) {
    if !stagger.is_zero() {
        match shutdown.wait_timeout(stagger) {
            Ok(false) => {}
            Ok(true) => return,
            Err(()) => {
                logger.fatal(
                    "planner",
                    &format!("interval wait failed for {} task; task halted", source.name()),
                );
                return;
            }
        }
    }

    logger.info("planner", &format!("initial {} load", source.name()));
    run_cycle(source.as_ref(), &logger);

    loop {
        match shutdown.wait_timeout(source.interval()) {
            Ok(false) => {}
            Ok(true) => {
                logger.info(
                    "planner",
                    &format!("{} task stopping on shutdown", source.name()),
                );
                return;
            }
            Err(()) => {
                // Broken wait construct: the task's only terminal state.
                logger.fatal(
                    "planner",
                    &format!("interval wait failed for {} task; task halted", source.name()),
                );
                return;
            }
        }

        logger.info("planner", &format!("periodic {} load", source.name()));
        run_cycle(source.as_ref(), &logger);
    }
}

/// One cycle: errors are caught here and never cross the task boundary.
fn run_cycle(source: &dyn DashboardSource, logger: &Logger) {
    if let Err(e) = source.refresh() {
        logger.error(
            source.log_stream(),
            &format!("{} refresh failed: {}", source.name(), e),
        );
    }
}
