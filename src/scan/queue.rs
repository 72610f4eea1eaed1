// src/scan/queue.rs
// =============================================================================
// A bounded, multi-producer/multi-consumer queue that knows when its work
// is finished.
//
// Used twice:
// - the frontier: domains waiting to be scanned (workers feed it too)
// - the result channel: records waiting for the writer
//
// How it works:
// - A bounded tokio mpsc channel holds the items. `enqueue` waits while it
//   is full; that wait is the crawler's only flow control.
// - The receiver sits behind a Mutex so several workers can take turns
//   pulling from it.
// - `outstanding` counts items that were enqueued but not yet acked.
//   `join` waits until it drops to zero, which means "no queued work and
//   nobody is still working on something they pulled".
// - `close` tells consumers to stop waiting once the queue is empty.
// =============================================================================

use crate::error::QueueError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, Notify};

// What a consumer gets back from `dequeue`
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued<T> {
    /// An item to work on; must be acked when done
    Item(T),
    /// Nothing arrived within the wait time
    Idle,
    /// The queue was closed and everything in it has been handed out
    Closed,
}

pub struct WorkQueue<T> {
    sender: mpsc::Sender<T>,
    receiver: Mutex<mpsc::Receiver<T>>,
    outstanding: AtomicUsize,
    drained: Notify,
    closed: watch::Sender<bool>,
}

impl<T: Send> WorkQueue<T> {
    /// Creates a queue holding at most `capacity` items (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (closed, _) = watch::channel(false);

        Self {
            sender,
            receiver: Mutex::new(receiver),
            outstanding: AtomicUsize::new(0),
            drained: Notify::new(),
            closed,
        }
    }

    /// Adds an item, waiting for room if the queue is full
    pub async fn enqueue(&self, item: T) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let permit = self.sender.reserve().await.map_err(|_| QueueError::Closed)?;

        // Counted before the item becomes visible so a consumer can never
        // ack it before it was counted.
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        permit.send(item);
        Ok(())
    }

    /// Takes the next item, waiting at most `wait` for one to arrive
    pub async fn dequeue(&self, wait: Duration) -> Dequeued<T> {
        let mut closed = self.closed.subscribe();

        let next = async {
            let mut receiver = self.receiver.lock().await;

            if *closed.borrow_and_update() {
                receiver.close();
                return receiver.recv().await;
            }

            tokio::select! {
                item = receiver.recv() => item,
                _ = wait_until_closed(&mut closed) => {
                    // Stop producers, then hand out whatever is still buffered
                    receiver.close();
                    receiver.recv().await
                }
            }
        };

        match tokio::time::timeout(wait, next).await {
            Ok(Some(item)) => Dequeued::Item(item),
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::Idle,
        }
    }

    /// Marks one dequeued item as finished
    pub fn ack(&self) {
        let previous = self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.drained.notify_waiters(),
            Ok(_) => {}
            Err(_) => tracing::warn!("ack without an outstanding item"),
        }
    }

    /// Waits until every enqueued item has been acked
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            tokio::pin!(notified);
            // Register before checking so a notify in between isn't lost
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }

    /// Stops accepting items. Consumers drain what is left, then see Closed.
    pub fn close(&self) {
        self.closed.send_replace(true);

        // Release blocked producers right away when no consumer is waiting
        if let Ok(mut receiver) = self.receiver.try_lock() {
            receiver.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Items enqueued but not yet acked
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Items currently buffered
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }
}

async fn wait_until_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|is_closed| *is_closed).await;
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a Mutex around the receiver?
//    - tokio's mpsc channel allows many senders but only one receiver
//    - Wrapping the receiver in a Mutex lets several workers share it
//    - Only one worker waits inside recv() at a time; the rest wait for the lock
//
// 2. What does reserve() do?
//    - It waits until the channel has room and hands back a "permit"
//    - Sending through the permit can't fail or block
//    - If the caller gives up while waiting, nothing was counted yet
//
// 3. Why enable() the Notified future in join()?
//    - notify_waiters() only wakes futures that are already registered
//    - enable() registers us before we read the counter, so an ack that
//      lands between the check and the await still wakes us
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_enqueue_dequeue_ack() {
        let queue = WorkQueue::new(4);
        queue.enqueue("a.com".to_string()).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.outstanding(), 1);

        let item = queue.dequeue(SHORT).await;
        assert_eq!(item, Dequeued::Item("a.com".to_string()));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.outstanding(), 1);

        queue.ack();
        assert_eq!(queue.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_empty_queue_reports_idle() {
        let queue: WorkQueue<String> = WorkQueue::new(4);
        assert_eq!(queue.dequeue(SHORT).await, Dequeued::Idle);
    }

    #[tokio::test]
    async fn test_full_queue_blocks_until_dequeue() {
        let queue = Arc::new(WorkQueue::new(1));
        queue.enqueue("a.com").await.unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue("b.com").await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!producer.is_finished());
        assert_eq!(queue.outstanding(), 1);

        assert_eq!(queue.dequeue(SHORT).await, Dequeued::Item("a.com"));
        tokio::time::timeout(Duration::from_secs(1), producer)
            .await
            .expect("enqueue should finish once there is room")
            .unwrap()
            .unwrap();

        assert_eq!(queue.dequeue(SHORT).await, Dequeued::Item("b.com"));
        assert_eq!(queue.outstanding(), 2);
    }

    #[tokio::test]
    async fn test_join_waits_for_every_ack() {
        let queue = Arc::new(WorkQueue::new(4));
        queue.enqueue(1).await.unwrap();
        queue.enqueue(2).await.unwrap();

        let joiner = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.join().await })
        };

        assert_eq!(queue.dequeue(SHORT).await, Dequeued::Item(1));
        queue.ack();
        tokio::time::sleep(SHORT).await;
        assert!(!joiner.is_finished());

        assert_eq!(queue.dequeue(SHORT).await, Dequeued::Item(2));
        queue.ack();
        tokio::time::timeout(Duration::from_secs(1), joiner)
            .await
            .expect("join should return after the last ack")
            .unwrap();
    }

    #[tokio::test]
    async fn test_join_on_empty_queue_returns() {
        let queue: WorkQueue<u32> = WorkQueue::new(1);
        tokio::time::timeout(SHORT, queue.join()).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_drains_then_reports_closed() {
        let queue = WorkQueue::new(4);
        queue.enqueue(7).await.unwrap();
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.enqueue(8).await, Err(QueueError::Closed));
        assert_eq!(queue.dequeue(SHORT).await, Dequeued::Item(7));
        assert_eq!(queue.dequeue(SHORT).await, Dequeued::Closed);
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_consumer() {
        let queue: Arc<WorkQueue<u32>> = Arc::new(WorkQueue::new(4));

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.dequeue(Duration::from_secs(30)).await })
        };

        tokio::time::sleep(SHORT).await;
        queue.close();

        let result = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake on close")
            .unwrap();
        assert_eq!(result, Dequeued::Closed);
    }
}
