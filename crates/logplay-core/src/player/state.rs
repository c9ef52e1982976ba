//! Shared playback state
//!
//! The active player task is the one piece of state touched from two
//! threads: the command thread stops tasks explicitly, and a task clears
//! itself when it runs off the end of the log or hits an error. Both paths
//! go through the same mutex.

use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::PlayerError;
use crate::sync;

/// What kind of run a player task was started for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMode {
    /// Play until stopped or the log ends
    Continuous,
    /// Stop after the first record whose channel starts with the prefix
    Step(String),
}

/// Cooperative stop flag that can also be slept on
#[derive(Debug, Default)]
pub(crate) struct StopSignal {
    requested: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn request(&self) {
        *sync::lock(&self.requested) = true;
        self.wake.notify_all();
    }

    pub(crate) fn is_requested(&self) -> bool {
        *sync::lock(&self.requested)
    }

    /// Sleep for up to `timeout`. Returns true if a stop was requested
    /// before or during the sleep.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let guard = sync::lock(&self.requested);
        if timeout.is_zero() || *guard {
            return *guard;
        }
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, timeout, |stop| !*stop)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Handle to the running player task
#[derive(Debug)]
pub struct ActiveTask {
    id: u64,
    mode: TaskMode,
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

impl ActiveTask {
    /// Task number, unique per slot
    pub fn id(&self) -> u64 {
        self.id
    }

    /// What the task was started for
    pub fn mode(&self) -> &TaskMode {
        &self.mode
    }
}

/// Whether a player task is alive
#[derive(Debug, Default)]
pub enum PlaybackState {
    /// No task is alive
    #[default]
    Stopped,
    /// A task is running
    Playing(ActiveTask),
}

/// The single slot a player task may occupy
#[derive(Debug, Clone, Default)]
pub struct TaskSlot {
    state: Arc<Mutex<PlaybackState>>,
    /// Mirrors `state` so it can be read without the lock, including from
    /// observer callbacks that run while it is held
    playing: Arc<AtomicBool>,
    next_id: Arc<AtomicU64>,
}

impl TaskSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a player task occupies the slot. Never blocks.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Mode of the active task, if any.
    ///
    /// Takes the slot lock; must not be called from
    /// [`PlaybackObserver::playing_changed`](crate::feedback::PlaybackObserver::playing_changed).
    pub fn active_mode(&self) -> Option<TaskMode> {
        match &*sync::lock(&self.state) {
            PlaybackState::Playing(task) => Some(task.mode.clone()),
            PlaybackState::Stopped => None,
        }
    }

    /// Start a task unless one is already active.
    ///
    /// `spawn` runs with the slot locked, so the new task cannot observe
    /// the slot before it has been registered. Returns false if a task was
    /// already running.
    pub(crate) fn launch<F>(&self, mode: TaskMode, spawn: F) -> Result<bool, PlayerError>
    where
        F: FnOnce(u64, Arc<StopSignal>) -> Result<JoinHandle<()>, PlayerError>,
    {
        let mut state = sync::lock(&self.state);
        if matches!(*state, PlaybackState::Playing(_)) {
            return Ok(false);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let stop = Arc::new(StopSignal::new());
        let handle = spawn(id, Arc::clone(&stop))?;
        tracing::debug!(id, ?mode, "Player task started");
        *state = PlaybackState::Playing(ActiveTask {
            id,
            mode,
            stop,
            handle,
        });
        self.playing.store(true, Ordering::Release);
        Ok(true)
    }

    /// Ask the active task to stop and wait for its thread to exit.
    ///
    /// Once this returns the task no longer touches the log or the sink.
    /// Returns false if nothing was running.
    pub fn stop(&self) -> bool {
        let task = {
            let mut state = sync::lock(&self.state);
            match mem::take(&mut *state) {
                PlaybackState::Playing(task) => {
                    self.playing.store(false, Ordering::Release);
                    task.stop.request();
                    task
                }
                PlaybackState::Stopped => return false,
            }
        };

        if task.handle.join().is_err() {
            tracing::error!(id = task.id, "Player task panicked");
        }
        tracing::debug!(id = task.id, "Player task joined");
        true
    }

    /// Run `f` under the slot lock (task start notification)
    pub(crate) fn started(&self, f: impl FnOnce()) {
        let _state = sync::lock(&self.state);
        f();
    }

    /// Final action of a task thread: clear the slot if it still holds
    /// task `id`, then run `on_stopped` under the same lock.
    pub(crate) fn finish(&self, id: u64, on_stopped: impl FnOnce()) {
        let mut state = sync::lock(&self.state);
        if matches!(&*state, PlaybackState::Playing(task) if task.id == id) {
            *state = PlaybackState::Stopped;
            self.playing.store(false, Ordering::Release);
        }
        on_stopped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_stop_signal_wakes_sleeper() {
        let stop = Arc::new(StopSignal::new());
        let sleeper = {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let start = Instant::now();
                let stopped = stop.wait(Duration::from_secs(10));
                (stopped, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(20));
        stop.request();
        let (stopped, elapsed) = sleeper.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_stop_signal_times_out() {
        let stop = StopSignal::new();
        assert!(!stop.wait(Duration::from_millis(5)));
        assert!(!stop.wait(Duration::ZERO));
        stop.request();
        assert!(stop.wait(Duration::ZERO));
        assert!(stop.is_requested());
    }

    fn spawn_until_stopped(slot: &TaskSlot) -> bool {
        let task_slot = slot.clone();
        slot.launch(TaskMode::Continuous, move |id, stop| {
            Ok(thread::spawn(move || {
                while !stop.wait(Duration::from_millis(5)) {}
                task_slot.finish(id, || {});
            }))
        })
        .unwrap()
    }

    #[test]
    fn test_single_active_task() {
        let slot = TaskSlot::new();
        assert!(spawn_until_stopped(&slot));
        assert!(slot.is_playing());
        assert_eq!(slot.active_mode(), Some(TaskMode::Continuous));
        assert!(!spawn_until_stopped(&slot));

        assert!(slot.stop());
        assert!(!slot.is_playing());
        assert!(!slot.stop());
    }

    #[test]
    fn test_self_finishing_task_clears_slot() {
        let slot = TaskSlot::new();
        let task_slot = slot.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        slot.launch(TaskMode::Step("X".into()), move |id, _stop| {
            Ok(thread::spawn(move || {
                task_slot.finish(id, || {});
                tx.send(()).unwrap();
            }))
        })
        .unwrap();

        rx.recv().unwrap();
        assert!(!slot.is_playing());
        assert!(!slot.stop());
    }

    #[test]
    fn test_is_playing_inside_notifications() {
        let slot = TaskSlot::new();
        let task_slot = slot.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        slot.launch(TaskMode::Continuous, move |id, _stop| {
            Ok(thread::spawn(move || {
                let mut seen = Vec::new();
                task_slot.started(|| seen.push(task_slot.is_playing()));
                task_slot.finish(id, || seen.push(task_slot.is_playing()));
                tx.send(seen).unwrap();
            }))
        })
        .unwrap();

        let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(seen, vec![true, false]);
    }
}
