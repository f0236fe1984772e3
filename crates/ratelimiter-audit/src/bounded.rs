//! Bounded, non-blocking, drop-oldest outbound queue.
//!
//! The service must never block the decision path on audit back-pressure,
//! but a plain `tokio::sync::mpsc` only supports drop-newest semantics under
//! `try_send`: once full, the *new* event is rejected, which would silently
//! lose the most recent decisions first. What's wanted is the opposite —
//! drop the *oldest* pending event and keep making room for fresh ones.
//! `mpsc::Receiver` only pops from the front, and
//! nothing lets a sender reach in and evict an already-queued item, so this
//! is a small ring built directly on a `Mutex<VecDeque>` plus a `Notify`,
//! rather than layered on top of `mpsc`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
    senders: AtomicUsize,
}

/// The sending half. Cheaply `Clone`able; each decision-path enqueue goes
/// through [`DropOldestSender::send`], which never awaits I/O and never blocks.
pub struct DropOldestSender<T> {
    shared: Arc<Shared<T>>,
}

/// The receiving half, drained by the audit fan-out background task.
pub struct DropOldestReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// Creates a bounded drop-oldest channel with room for `capacity` pending items.
pub fn drop_oldest_channel<T>(capacity: usize) -> (DropOldestSender<T>, DropOldestReceiver<T>) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        capacity: capacity.max(1),
        dropped: AtomicU64::new(0),
        senders: AtomicUsize::new(1),
    });
    (
        DropOldestSender {
            shared: Arc::clone(&shared),
        },
        DropOldestReceiver { shared },
    )
}

impl<T> DropOldestSender<T> {
    /// Enqueues `item`. If the queue is already at capacity, the oldest
    /// pending item is evicted to make room and `true` is returned.
    ///
    /// This only awaits an uncontended `Mutex` (never I/O), so it is safe to
    /// call from the request path without risking back-pressure stalls.
    pub async fn send(&self, item: T) -> bool {
        let mut queue = self.shared.queue.lock().await;
        let evicted = if queue.len() >= self.shared.capacity {
            queue.pop_front();
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        };
        queue.push_back(item);
        drop(queue);
        self.shared.notify.notify_one();
        evicted
    }

    /// Total number of items evicted to make room for a newer one so far.
    pub fn dropped_count(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Clone for DropOldestSender<T> {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for DropOldestSender<T> {
    fn drop(&mut self) {
        self.shared.senders.fetch_sub(1, Ordering::Relaxed);
        self.shared.notify.notify_one();
    }
}

impl<T> DropOldestReceiver<T> {
    /// Waits for the next item. Returns `None` once every sender has been
    /// dropped and the queue has drained, signaling the fan-out worker to exit.
    pub async fn recv(&self) -> Option<T> {
        loop {
            {
                let mut queue = self.shared.queue.lock().await;
                if let Some(item) = queue.pop_front() {
                    return Some(item);
                }
                if self.shared.senders.load(Ordering::Relaxed) == 0 {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }
}
