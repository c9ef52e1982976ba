//! Event serializer
//!
//! A single worker thread executes every control event in submission
//! order. Because all state-changing operations run on that one thread,
//! starting, stopping and seeking never race with one another.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::events::PlayerEvent;
use crate::error::PlayerError;

/// Executes dequeued events
pub trait EventHandler: Send + 'static {
    /// Execute one event. Errors are logged by the serializer.
    fn handle(&mut self, event: PlayerEvent) -> Result<(), PlayerError>;
}

impl<F> EventHandler for F
where
    F: FnMut(PlayerEvent) -> Result<(), PlayerError> + Send + 'static,
{
    fn handle(&mut self, event: PlayerEvent) -> Result<(), PlayerError> {
        self(event)
    }
}

enum Envelope {
    Event(PlayerEvent),
    Shutdown,
}

/// Cloneable producer handle; usable from any thread
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<Envelope>,
}

impl EventSender {
    /// Queue an event. Never blocks.
    pub fn submit(&self, event: PlayerEvent) {
        if let Err(mpsc::SendError(Envelope::Event(event))) = self.tx.send(Envelope::Event(event)) {
            tracing::warn!(?event, "Event dropped: serializer has shut down");
        }
    }
}

/// Owner of the command thread
pub struct EventSerializer<H: EventHandler> {
    sender: EventSender,
    worker: Option<JoinHandle<H>>,
}

impl<H: EventHandler> EventSerializer<H> {
    /// Start the command thread with `handler`
    pub fn spawn(handler: H) -> Result<Self, PlayerError> {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("logplay-events".into())
            .spawn(move || run_worker(handler, rx))
            .map_err(|source| PlayerError::Spawn {
                name: "event serializer",
                source,
            })?;

        Ok(Self {
            sender: EventSender { tx },
            worker: Some(worker),
        })
    }

    /// A producer handle for another thread
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Queue an event
    pub fn submit(&self, event: PlayerEvent) {
        self.sender.submit(event);
    }

    /// Finish every event queued so far, stop the thread and return the
    /// handler. Returns `None` if the worker thread died.
    pub fn shutdown(mut self) -> Option<H> {
        self.stop_worker()
    }

    fn stop_worker(&mut self) -> Option<H> {
        let worker = self.worker.take()?;
        let _ = self.sender.tx.send(Envelope::Shutdown);
        match worker.join() {
            Ok(handler) => Some(handler),
            Err(_) => {
                tracing::error!("Event serializer thread panicked");
                None
            }
        }
    }
}

impl<H: EventHandler> Drop for EventSerializer<H> {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn run_worker<H: EventHandler>(mut handler: H, rx: Receiver<Envelope>) -> H {
    let mut seq: u64 = 0;
    while let Ok(envelope) = rx.recv() {
        match envelope {
            Envelope::Event(event) => {
                seq += 1;
                dispatch(&mut handler, seq, event);
            }
            Envelope::Shutdown => break,
        }
    }
    tracing::debug!(events = seq, "Event serializer stopped");
    handler
}

fn dispatch<H: EventHandler>(handler: &mut H, seq: u64, event: PlayerEvent) {
    tracing::debug!(seq, ?event, "Dispatching event");
    match panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(seq, error = %e, "Event failed"),
        Err(payload) => tracing::error!(seq, reason = panic_message(&*payload), "Event handler panicked"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown"
    }
}
