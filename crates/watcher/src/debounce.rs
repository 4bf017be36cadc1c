//! Deferred delivery and coalescing of raw event batches
//!
//! Backends push batches through an [`EventSink`] and return immediately.
//! The session dispatcher pulls them from the [`DeferredQueue`] on its own
//! turn, optionally merging batches that arrive within a coalescing window.

use crate::error::WatchError;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use stalewatch_core::ChangeEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

enum Message {
    Events(Vec<ChangeEvent>),
    Failed(WatchError),
    Closed,
}

/// Unit of work handed to the dispatcher
#[derive(Debug)]
pub enum Deferred {
    /// One coalesced batch, in arrival order
    Batch(Vec<ChangeEvent>),
    /// The backend failed; no further batches follow
    Failed(WatchError),
}

/// Create a connected sink, queue and gate
///
/// A zero `window` processes each emitted batch on its own.
pub fn channel(window: Duration) -> (EventSink, DeferredQueue, SinkGate) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let open = Arc::new(AtomicBool::new(true));

    let sink = EventSink {
        tx: tx.clone(),
        open: Arc::clone(&open),
    };
    let queue = DeferredQueue {
        rx,
        window,
        stashed_error: None,
        closing: false,
    };
    let gate = SinkGate { tx, open };

    (sink, queue, gate)
}

/// Write side given to an external watcher
///
/// Cheap to clone. Once the gate is closed every emission is dropped.
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<Message>,
    open: Arc<AtomicBool>,
}

impl EventSink {
    /// Queue a batch of events
    ///
    /// Returns false if the batch was dropped (empty, closed, or the session
    /// is gone). Backends can stop producing once this returns false.
    pub fn emit(&self, events: Vec<ChangeEvent>) -> bool {
        if events.is_empty() {
            debug!("Dropping empty event batch");
            return false;
        }
        if !self.is_open() {
            trace!("Sink closed, dropping {} events", events.len());
            return false;
        }
        self.tx.send(Message::Events(events)).is_ok()
    }

    /// Report a fatal backend error
    pub fn fail(&self, error: WatchError) -> bool {
        if !self.is_open() {
            trace!("Sink closed, dropping backend error: {}", error);
            return false;
        }
        self.tx.send(Message::Failed(error)).is_ok()
    }

    /// Check whether emissions are still accepted
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("open", &self.is_open())
            .finish()
    }
}

/// Closes a sink from the session side
pub struct SinkGate {
    tx: Sender<Message>,
    open: Arc<AtomicBool>,
}

impl SinkGate {
    /// Stop accepting emissions
    ///
    /// Batches queued before this call are still delivered; the queue ends
    /// after them. Returns false if the gate was already closed.
    pub fn close(&self) -> bool {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        if was_open {
            let _ = self.tx.send(Message::Closed);
        }
        was_open
    }

    /// Check whether the gate is still open
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// Read side owned by the session dispatcher
pub struct DeferredQueue {
    rx: Receiver<Message>,
    window: Duration,
    stashed_error: Option<WatchError>,
    closing: bool,
}

impl DeferredQueue {
    /// Block until the next unit of work
    ///
    /// Returns `None` once the gate is closed and everything queued before it
    /// has been handed out, or when every sender is gone.
    pub fn next(&mut self) -> Option<Deferred> {
        self.next_inner(None)
    }

    /// Like [`next`](Self::next) but gives up after `timeout`
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<Deferred> {
        self.next_inner(Some(timeout))
    }

    fn next_inner(&mut self, timeout: Option<Duration>) -> Option<Deferred> {
        if let Some(error) = self.stashed_error.take() {
            return Some(Deferred::Failed(error));
        }
        if self.closing {
            return None;
        }

        let first = match timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).ok()?,
            None => self.rx.recv().ok()?,
        };
        let mut events = match first {
            Message::Events(events) => events,
            Message::Failed(error) => return Some(Deferred::Failed(error)),
            Message::Closed => {
                self.closing = true;
                return None;
            }
        };

        if !self.window.is_zero() {
            let deadline = Instant::now() + self.window;
            loop {
                match self.rx.recv_deadline(deadline) {
                    Ok(Message::Events(more)) => events.extend(more),
                    Ok(Message::Failed(error)) => {
                        self.stashed_error = Some(error);
                        break;
                    }
                    Ok(Message::Closed) => {
                        self.closing = true;
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        }

        Some(Deferred::Batch(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn batch(deferred: Option<Deferred>) -> Vec<ChangeEvent> {
        match deferred {
            Some(Deferred::Batch(events)) => events,
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_batches_stay_separate_without_window() {
        let (sink, mut queue, _gate) = channel(Duration::ZERO);
        assert!(sink.emit(vec![ChangeEvent::modified("a")]));
        assert!(sink.emit(vec![ChangeEvent::modified("b")]));

        assert_eq!(batch(queue.next()).len(), 1);
        assert_eq!(batch(queue.next()).len(), 1);
    }

    #[test]
    fn test_window_merges_batches_in_order() {
        let (sink, mut queue, _gate) = channel(Duration::from_millis(50));
        sink.emit(vec![ChangeEvent::modified("a")]);
        sink.emit(vec![ChangeEvent::modified("b"), ChangeEvent::deleted("c")]);

        let events = batch(queue.next());
        let paths: Vec<&str> = events
            .iter()
            .map(|e| e.path.to_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_batch_is_dropped() {
        let (sink, mut queue, _gate) = channel(Duration::ZERO);
        assert!(!sink.emit(Vec::new()));
        assert!(queue.next_timeout(Duration::from_millis(20)).is_none());
    }

    #[test]
    fn test_close_drains_then_ends() {
        let (sink, mut queue, gate) = channel(Duration::ZERO);
        sink.emit(vec![ChangeEvent::modified("a")]);

        assert!(gate.close());
        assert!(!gate.close());
        assert!(!sink.emit(vec![ChangeEvent::modified("b")]));

        // Queued before close: still delivered
        assert_eq!(batch(queue.next()).len(), 1);
        assert!(queue.next().is_none());
        assert!(queue.next().is_none());
    }

    #[test]
    fn test_failure_after_window_batch() {
        let (sink, mut queue, _gate) = channel(Duration::from_millis(50));
        sink.emit(vec![ChangeEvent::modified("a")]);
        sink.fail(WatchError::NoRuntime);

        assert_eq!(batch(queue.next()).len(), 1);
        assert!(matches!(queue.next(), Some(Deferred::Failed(WatchError::NoRuntime))));
    }

    #[test]
    fn test_emit_from_other_thread() {
        let (sink, mut queue, _gate) = channel(Duration::ZERO);
        let producer = thread::spawn(move || sink.emit(vec![ChangeEvent::created("x")]));
        assert!(producer.join().unwrap());

        assert_eq!(batch(queue.next_timeout(Duration::from_secs(1))).len(), 1);
    }
}
