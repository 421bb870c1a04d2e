//! Bounded-concurrency event scheduler.
//!
//! Every submitted event becomes one task on a [`JoinSet`] right away, so an
//! event handed to the scheduler is covered by the shutdown drain. Inside the
//! task, admission takes an owned permit from a semaphore of
//! `max_concurrency` permits; at most that many events dispatch at once. The
//! permit is released when the task ends, whatever the outcome.
//!
//! ```text
//! submit ─▶ spawn ─▶ [sender lock] ─▶ acquire permit ─▶ Dispatcher::dispatch
//!                                                  │
//!                        shutdown: close ─▶ drain (timeout) ─▶ abort ─▶ drain
//! ```
//!
//! With `serialize_per_sender`, each task takes its sender's lock before the
//! permit, so two events from one sender never run at the same time and a
//! sender's backlog waits without occupying admission slots.
//!
//! The poll loop calls [`Scheduler::ready`] before fetching, so no new
//! updates are acknowledged while every slot is busy.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, Semaphore};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use yabot_core::{Bot, InboundEvent};
use yabot_framework::Dispatcher;

/// Errors returned by [`Scheduler::submit`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler no longer admits events.
    #[error("scheduler is closed")]
    Closed,
}

/// Counts of finished events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Events whose processing ran to the end.
    pub completed: usize,
    /// Events whose task panicked outside of handler code.
    pub failed: usize,
    /// Events aborted after the shutdown timeout.
    pub cancelled: usize,
}

// =============================================================================
// SenderLocks
// =============================================================================

type LockMap = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// One async lock per sender login.
///
/// Entries exist only while a task holds or waits for them.
#[derive(Clone, Default)]
pub struct SenderLocks {
    locks: LockMap,
}

impl SenderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `login`.
    pub async fn acquire(&self, login: &str) -> SenderGuard {
        let lock = self
            .locks
            .lock()
            .entry(login.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        SenderGuard {
            login: login.to_string(),
            locks: self.locks.clone(),
            _guard: guard,
        }
    }

    /// Number of senders with a held or awaited lock.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

impl fmt::Debug for SenderLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderLocks")
            .field("senders", &self.len())
            .finish()
    }
}

/// Exclusive access to one sender, released on drop.
pub struct SenderGuard {
    login: String,
    locks: LockMap,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for SenderGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // The map and this guard hold the only references: nobody is waiting.
        if locks
            .get(&self.login)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            locks.remove(&self.login);
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Runs dispatches concurrently under a global limit.
pub struct Scheduler {
    dispatcher: Arc<Dispatcher>,
    bot: Bot,
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    sender_locks: Option<SenderLocks>,
    closed: bool,
    tasks: JoinSet<()>,
    in_flight: HashMap<Id, i64>,
    report: ShutdownReport,
}

impl Scheduler {
    pub fn new(dispatcher: Arc<Dispatcher>, bot: Bot, config: &SchedulerConfig) -> Self {
        let max_concurrency = config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            dispatcher,
            bot,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            sender_locks: config.serialize_per_sender.then(SenderLocks::new),
            closed: false,
            tasks: JoinSet::new(),
            in_flight: HashMap::new(),
            report: ShutdownReport::default(),
        }
    }

    /// Number of events currently holding a permit.
    pub fn active(&self) -> usize {
        self.max_concurrency - self.semaphore.available_permits()
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Counts of the tasks reaped so far.
    pub fn report(&self) -> ShutdownReport {
        self.report
    }

    /// Stops admitting events. Submitted ones are not affected.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Waits until fewer than `max_concurrency` events are dispatching.
    pub async fn ready(&self) -> Result<(), SchedulerError> {
        if self.closed {
            return Err(SchedulerError::Closed);
        }
        self.semaphore
            .acquire()
            .await
            .map(drop)
            .map_err(|_| SchedulerError::Closed)
    }

    /// Starts processing `event`. It dispatches once a slot is free.
    pub fn submit(&mut self, event: InboundEvent) -> Result<(), SchedulerError> {
        if self.closed {
            return Err(SchedulerError::Closed);
        }

        let update_id = event.update_id();
        let dispatcher = self.dispatcher.clone();
        let bot = self.bot.clone();
        let semaphore = self.semaphore.clone();
        let sender_locks = self.sender_locks.clone();

        let handle = self.tasks.spawn(async move {
            let _sender = match &sender_locks {
                Some(locks) => Some(locks.acquire(event.login()).await),
                None => None,
            };
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let dispatched = dispatcher.dispatch(&bot, event).await;
            debug!(update_id, result = ?dispatched, "Event processed");
        });
        self.in_flight.insert(handle.id(), update_id);

        self.reap();
        Ok(())
    }

    /// Records tasks that already finished.
    pub fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next_with_id() {
            self.record(result);
        }
    }

    /// Closes admission and waits up to `timeout` for running events, then
    /// aborts the rest and waits for them to stop.
    pub async fn shutdown(mut self, timeout: Duration) -> ShutdownReport {
        self.close();

        let running = self.tasks.len();
        if running > 0 {
            info!(running, timeout_secs = timeout.as_secs_f64(), "Waiting for running events");
        }

        if tokio::time::timeout(timeout, self.drain()).await.is_err() {
            warn!(
                remaining = self.tasks.len(),
                "Shutdown timeout elapsed, cancelling remaining events"
            );
            self.tasks.abort_all();
            self.drain().await;
        }

        self.report
    }

    async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next_with_id().await {
            self.record(result);
        }
    }

    fn record(&mut self, result: Result<(Id, ()), JoinError>) {
        match result {
            Ok((id, ())) => {
                self.in_flight.remove(&id);
                self.report.completed += 1;
            }
            Err(e) => {
                let update_id = self.in_flight.remove(&e.id());
                if e.is_cancelled() {
                    warn!(update_id, "Event processing cancelled");
                    self.report.cancelled += 1;
                } else {
                    error!(update_id, error = %e, "Event processing panicked");
                    self.report.failed += 1;
                }
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("max_concurrency", &self.max_concurrency)
            .field("active", &self.active())
            .field("pending", &self.tasks.len())
            .field("closed", &self.closed)
            .field("serialize_per_sender", &self.sender_locks.is_some())
            .finish()
    }
}
