//! Bounded inbound queue with a drop-oldest policy.
//!
//! `push` never blocks and never fails: when the queue is at capacity the
//! oldest envelope is evicted first. `pop` waits until an envelope arrives or
//! the queue is closed; a closed queue still hands out what it holds, then
//! fails with `Closed` forever.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use wsocket_core::error::{Result, WsocketError};
use wsocket_core::protocol::Envelope;

/// Default capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

struct QueueInner {
    items: VecDeque<Envelope>,
    closed: bool,
    evicted: u64,
}

pub struct InboundQueue {
    inner: Mutex<QueueInner>,
    capacity: usize,
    notify: Notify,
}

impl InboundQueue {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY)),
                closed: false,
                evicted: 0,
            }),
            capacity,
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total envelopes evicted by the drop-oldest policy.
    pub fn evicted(&self) -> u64 {
        self.inner.lock().evicted
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Append an envelope, evicting the oldest one if the queue is full.
    /// Pushes after close are discarded.
    pub fn push(&self, env: Envelope) {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return;
            }
            if inner.items.len() >= self.capacity {
                inner.items.pop_front();
                inner.evicted += 1;
                tracing::trace!(capacity = self.capacity, "inbound queue full, dropped oldest");
            }
            inner.items.push_back(env);
        }
        self.notify.notify_one();
    }

    /// One-way transition; wakes every waiting `pop`.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Take the oldest envelope without waiting.
    pub fn try_pop(&self) -> Option<Envelope> {
        self.inner.lock().items.pop_front()
    }

    /// Wait for the oldest envelope. Fails with `Closed` once the queue is
    /// closed and drained.
    pub async fn pop(&self) -> Result<Envelope> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a close between the check and the
            // await still wakes us.
            notified.as_mut().enable();

            {
                let mut inner = self.inner.lock();
                if let Some(env) = inner.items.pop_front() {
                    let more = !inner.items.is_empty();
                    drop(inner);
                    if more {
                        // Pass the wakeup on to another waiting consumer.
                        self.notify.notify_one();
                    }
                    return Ok(env);
                }
                if inner.closed {
                    return Err(WsocketError::Closed);
                }
            }

            notified.await;
        }
    }
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn data(q: &InboundQueue) -> Vec<String> {
        std::iter::from_fn(|| q.try_pop()).map(|e| e.data).collect()
    }

    #[test]
    fn drops_oldest_at_capacity() {
        let q = InboundQueue::new(3);
        for d in ["a", "b", "c", "d"] {
            q.push(Envelope::raw(d));
        }
        assert_eq!(q.len(), 3);
        assert_eq!(q.evicted(), 1);
        assert_eq!(data(&q), vec!["b", "c", "d"]);
    }

    #[test]
    fn keeps_last_capacity_items_in_order() {
        for (capacity, pushes) in [(1usize, 5usize), (4, 4), (4, 11), (10, 1000)] {
            let q = InboundQueue::new(capacity);
            for i in 0..pushes {
                q.push(Envelope::raw(i.to_string()));
            }
            let expect: Vec<String> = (pushes.saturating_sub(capacity)..pushes)
                .map(|i| i.to_string())
                .collect();
            assert_eq!(data(&q), expect, "capacity={capacity} pushes={pushes}");
        }
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let q = InboundQueue::new(0);
        q.push(Envelope::raw("x"));
        q.push(Envelope::raw("y"));
        assert_eq!(data(&q), vec!["y"]);
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let q = Arc::new(InboundQueue::new(8));
        let q2 = q.clone();
        let waiter = tokio::spawn(async move { q2.pop().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        q.push(Envelope::raw("late"));
        assert_eq!(waiter.await.unwrap().unwrap().data, "late");
    }

    #[tokio::test]
    async fn close_drains_then_fails() {
        let q = InboundQueue::new(8);
        q.push(Envelope::raw("last"));
        q.close();
        assert_eq!(q.pop().await.unwrap().data, "last");
        assert!(matches!(q.pop().await, Err(WsocketError::Closed)));
        assert!(matches!(q.pop().await, Err(WsocketError::Closed)));
        q.push(Envelope::raw("ignored"));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn close_wakes_every_waiter() {
        let q = Arc::new(InboundQueue::new(8));
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let q = q.clone();
                tokio::spawn(async move { q.pop().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.close();
        for w in waiters {
            assert!(matches!(w.await.unwrap(), Err(WsocketError::Closed)));
        }
    }
}
