//! Bounded, per-namespace FIFO sitting between the `Dispatcher` and an
//! `ActionConsumer`.
//!
//! Single producer (the dispatcher), single consumer (the owning
//! `ActionConsumer`'s run loop) — a bounded `tokio::mpsc` channel already
//! gives us exactly the ordering and backpressure semantics this pipeline
//! needs, so this module is a thin, typed wrapper rather than a hand-rolled
//! ring buffer.

use tokio::sync::mpsc;

/// The producer half of a namespace's action queue. Cheaply `Clone`-able;
/// the dispatcher hands clones to whichever task needs to enqueue into this
/// namespace.
pub struct NsQueue<T> {
    namespace: String,
    capacity: usize,
    sender: mpsc::Sender<T>,
}

impl<T> Clone for NsQueue<T> {
    fn clone(&self) -> Self {
        Self {
            namespace: self.namespace.clone(),
            capacity: self.capacity,
            sender: self.sender.clone(),
        }
    }
}

/// The consumer half, owned exclusively by the `ActionConsumer` that drains
/// it.
pub struct NsQueueConsumer<T> {
    namespace: String,
    receiver: mpsc::Receiver<T>,
}

/// Create a bounded queue for `namespace` with room for `capacity` pending
/// actions.
pub fn channel<T>(namespace: impl Into<String>, capacity: usize) -> (NsQueue<T>, NsQueueConsumer<T>) {
    let namespace = namespace.into();
    let (sender, receiver) = mpsc::channel(capacity);
    (
        NsQueue {
            namespace: namespace.clone(),
            capacity,
            sender,
        },
        NsQueueConsumer { namespace, receiver },
    )
}

impl<T> NsQueue<T> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Current number of actions buffered and not yet dequeued.
    pub fn length(&self) -> usize {
        self.capacity.saturating_sub(self.sender.capacity())
    }

    pub fn non_empty(&self) -> bool {
        self.length() > 0
    }

    /// Enqueue `action`, suspending until there is room if the queue is at
    /// `capacity`.
    ///
    /// Logs at debug when the call has to wait. Returns without enqueuing if
    /// the consumer has already exited and dropped its receiver — there is
    /// nothing left to deliver to.
    pub async fn enqueue(&self, action: T) {
        if self.sender.capacity() == 0 {
            tracing::debug!(
                namespace = %self.namespace,
                capacity = self.capacity,
                "namespace queue full, applying backpressure"
            );
        }
        if self.sender.send(action).await.is_err() {
            tracing::debug!(namespace = %self.namespace, "consumer has exited, dropping action");
        }
    }
}

impl<T> NsQueueConsumer<T> {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Pop the next action, suspending until one is available or the queue
    /// is closed (every `NsQueue` clone dropped).
    pub async fn dequeue(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let (queue, mut consumer) = channel::<u32>("default", 4);
        queue.enqueue(1).await;
        queue.enqueue(2).await;
        queue.enqueue(3).await;
        assert_eq!(consumer.dequeue().await, Some(1));
        assert_eq!(consumer.dequeue().await, Some(2));
        assert_eq!(consumer.dequeue().await, Some(3));
    }

    #[tokio::test]
    async fn length_tracks_unconsumed_items() {
        let (queue, mut consumer) = channel::<u32>("default", 4);
        assert_eq!(queue.length(), 0);
        assert!(!queue.non_empty());
        queue.enqueue(1).await;
        queue.enqueue(2).await;
        assert_eq!(queue.length(), 2);
        assert!(queue.non_empty());
        consumer.dequeue().await;
        assert_eq!(queue.length(), 1);
    }

    #[tokio::test]
    async fn enqueue_suspends_until_capacity_frees_up() {
        let (queue, mut consumer) = channel::<u32>("default", 1);
        queue.enqueue(1).await;
        assert_eq!(queue.length(), 1);

        let queue2 = queue.clone();
        let putter = tokio::spawn(async move {
            queue2.enqueue(2).await;
        });
        tokio::task::yield_now().await;
        assert!(!putter.is_finished(), "enqueue should block while the queue is full");

        assert_eq!(consumer.dequeue().await, Some(1));
        putter.await.unwrap();
        assert_eq!(queue.length(), 1);
        assert_eq!(consumer.dequeue().await, Some(2));
    }
}
