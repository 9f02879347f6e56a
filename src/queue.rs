//! Hand-off of thread-affine work to the designated main thread.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

/// A unit of work bound to the main thread, consumed exactly once.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Thread-safe FIFO between any number of producer threads and the single
/// main-thread consumer.
///
/// Producers never wait for their action to run. The main thread calls
/// [`ActionQueue::drain_once`] once per tick.
pub struct ActionQueue {
    main_thread: ThreadId,
    pending: Mutex<VecDeque<Action>>,
}

impl ActionQueue {
    /// Creates a queue whose main thread is the calling thread.
    pub fn new() -> Self {
        Self::bound_to(thread::current().id())
    }

    pub fn bound_to(main_thread: ThreadId) -> Self {
        Self {
            main_thread,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub fn main_thread(&self) -> ThreadId {
        self.main_thread
    }

    pub fn is_main_thread(&self) -> bool {
        thread::current().id() == self.main_thread
    }

    pub fn enqueue(&self, action: impl FnOnce() + Send + 'static) {
        let mut pending = self.pending.lock().expect("action queue poisoned");
        pending.push_back(Box::new(action));
        debug!(pending = pending.len(), "queued action for main thread");
    }

    pub fn len(&self) -> usize {
        self.pending.lock().expect("action queue poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every action queued before this call, in FIFO order.
    ///
    /// Actions queued while the batch runs wait for the next tick. A panicking
    /// action is logged and the rest of the batch still runs. Calls from any
    /// thread other than the main one run nothing.
    pub fn drain_once(&self) -> usize {
        if !self.is_main_thread() {
            warn!("drain_once called off the main thread; ignoring");
            return 0;
        }

        let batch = std::mem::take(&mut *self.pending.lock().expect("action queue poisoned"));
        let count = batch.len();
        for action in batch {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(action)) {
                warn!(reason = %panic_message(payload.as_ref()), "queued action panicked");
            }
        }
        count
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_drain_runs_in_fifo_order() {
        let queue = ActionQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            let seen = seen.clone();
            queue.enqueue(move || seen.lock().unwrap().push(i));
        }

        assert_eq!(queue.drain_once(), 5);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(queue.drain_once(), 0);
    }

    #[test]
    fn test_actions_queued_during_drain_wait_for_next_tick() {
        let queue = Arc::new(ActionQueue::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let inner_queue = queue.clone();
        let inner_runs = runs.clone();
        queue.enqueue(move || {
            inner_runs.fetch_add(1, Ordering::SeqCst);
            let again = inner_runs.clone();
            inner_queue.enqueue(move || {
                again.fetch_add(10, Ordering::SeqCst);
            });
        });

        assert_eq!(queue.drain_once(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.drain_once(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_panicking_action_does_not_block_the_rest() {
        let queue = ActionQueue::new();
        let runs = Arc::new(AtomicUsize::new(0));

        queue.enqueue(|| panic!("boom"));
        let after = runs.clone();
        queue.enqueue(move || {
            after.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(queue.drain_once(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_producers_on_other_threads() {
        let queue = Arc::new(ActionQueue::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                let runs = runs.clone();
                thread::spawn(move || {
                    assert!(!queue.is_main_thread());
                    assert_eq!(queue.drain_once(), 0);
                    queue.enqueue(move || {
                        runs.fetch_add(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(queue.drain_once(), 4);
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }
}
