//! In-memory broker with at-least-once semantics.
//!
//! Each queue is a FIFO of pending messages. Consuming hands out
//! [`Delivery`] values whose ack removes the message for good and whose
//! `nack(requeue = true)` puts it back at the tail, flagged as redelivered.
//! A delivery dropped without being settled is returned the same way, as a
//! broker does when a consumer's channel closes. Closing a queue ends its
//! consumer streams. Faults can be injected on publish.

use brigade_core::broker::{
    Acknowledger, Broker, BrokerError, BrokerFuture, Delivery, DeliveryStream,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
struct Message {
    payload: Vec<u8>,
    redelivered: bool,
}

#[derive(Debug, Default)]
struct Queue {
    messages: Mutex<VecDeque<Message>>,
    notify: Notify,
    closed: AtomicBool,
}

impl Queue {
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn push(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(message);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Counters observed by tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Messages accepted by `publish`
    pub published: u64,
    /// Deliveries acked
    pub acked: u64,
    /// Deliveries nacked with requeue
    pub requeued: u64,
    /// Deliveries nacked without requeue
    pub rejected: u64,
    /// Deliveries dropped unsettled and returned to their queue
    pub returned: u64,
    /// Calls to `consume`
    pub consumes: u64,
}

#[derive(Debug, Default)]
struct Inner {
    queues: Mutex<HashMap<String, Arc<Queue>>>,
    next_tag: AtomicU64,
    published: AtomicU64,
    acked: AtomicU64,
    requeued: AtomicU64,
    rejected: AtomicU64,
    returned: AtomicU64,
    consumes: AtomicU64,
    fail_publishes: AtomicBool,
    stall_publishes: AtomicBool,
}

impl Inner {
    fn queue(&self, name: &str) -> Arc<Queue> {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(queues.entry(name.to_string()).or_default())
    }

    fn delivery(self: &Arc<Self>, queue: &Arc<Queue>, message: Message) -> Delivery {
        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed) + 1;
        let redelivered = message.redelivered;
        let payload = message.payload.clone();
        Delivery::new(
            payload,
            tag,
            redelivered,
            Box::new(InMemoryAcker {
                broker: Arc::clone(self),
                queue: Arc::clone(queue),
                message,
                settled: AtomicBool::new(false),
            }),
        )
    }
}

/// Settles a delivery against its in-memory queue.
struct InMemoryAcker {
    broker: Arc<Inner>,
    queue: Arc<Queue>,
    message: Message,
    settled: AtomicBool,
}

impl InMemoryAcker {
    fn redeliver(&self) {
        self.queue.push(Message {
            payload: self.message.payload.clone(),
            redelivered: true,
        });
    }
}

impl Acknowledger for InMemoryAcker {
    fn ack(&self) -> BrokerFuture<'_, ()> {
        self.settled.store(true, Ordering::SeqCst);
        self.broker.acked.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }

    fn nack(&self, requeue: bool) -> BrokerFuture<'_, ()> {
        self.settled.store(true, Ordering::SeqCst);
        if requeue {
            self.broker.requeued.fetch_add(1, Ordering::SeqCst);
            self.redeliver();
        } else {
            self.broker.rejected.fetch_add(1, Ordering::SeqCst);
        }
        Box::pin(async { Ok(()) })
    }
}

impl Drop for InMemoryAcker {
    fn drop(&mut self) {
        if !self.settled.load(Ordering::SeqCst) {
            self.broker.returned.fetch_add(1, Ordering::SeqCst);
            self.redeliver();
        }
    }
}

/// In-memory [`Broker`] for tests.
///
/// Cloning shares the underlying queues.
///
/// # Example
///
/// ```
/// use brigade_core::broker::Broker;
/// use brigade_testing::InMemoryBroker;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let broker = InMemoryBroker::new();
/// broker.publish("orders", b"{}", Duration::from_secs(5)).await.unwrap();
/// assert_eq!(broker.queue_len("orders"), 1);
///
/// let delivery = broker.next_delivery("orders").unwrap();
/// delivery.nack(true).await.unwrap();
/// assert!(broker.next_delivery("orders").unwrap().redelivered());
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl InMemoryBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail (or succeed again).
    pub fn fail_publishes(&self, fail: bool) {
        self.inner.fail_publishes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent publish hang until its deadline.
    pub fn stall_publishes(&self, stall: bool) {
        self.inner.stall_publishes.store(stall, Ordering::SeqCst);
    }

    /// Messages waiting in a queue (not counting unsettled deliveries).
    #[must_use]
    pub fn queue_len(&self, queue: &str) -> usize {
        self.inner.queue(queue).len()
    }

    /// Pop the next pending message as a delivery, without waiting.
    #[must_use]
    pub fn next_delivery(&self, queue: &str) -> Option<Delivery> {
        let q = self.inner.queue(queue);
        let message = q.pop()?;
        Some(self.inner.delivery(&q, message))
    }

    /// Put a raw payload on a queue, bypassing publish faults.
    pub fn inject(&self, queue: &str, payload: Vec<u8>) {
        self.inner.queue(queue).push(Message {
            payload,
            redelivered: false,
        });
    }

    /// End every consumer stream on a queue. Pending messages stay put.
    pub fn close(&self, queue: &str) {
        self.inner.queue(queue).close();
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            published: self.inner.published.load(Ordering::SeqCst),
            acked: self.inner.acked.load(Ordering::SeqCst),
            requeued: self.inner.requeued.load(Ordering::SeqCst),
            rejected: self.inner.rejected.load(Ordering::SeqCst),
            returned: self.inner.returned.load(Ordering::SeqCst),
            consumes: self.inner.consumes.load(Ordering::SeqCst),
        }
    }
}

impl Broker for InMemoryBroker {
    fn declare_queue<'a>(&'a self, queue: &'a str) -> BrokerFuture<'a, ()> {
        Box::pin(async move {
            let _ = self.inner.queue(queue);
            Ok(())
        })
    }

    fn publish<'a>(
        &'a self,
        queue: &'a str,
        payload: &'a [u8],
        timeout: Duration,
    ) -> BrokerFuture<'a, ()> {
        Box::pin(async move {
            if self.inner.fail_publishes.load(Ordering::SeqCst) {
                return Err(BrokerError::PublishFailed {
                    queue: queue.to_string(),
                    reason: "injected failure".to_string(),
                });
            }
            if self.inner.stall_publishes.load(Ordering::SeqCst) {
                tokio::time::sleep(timeout).await;
                return Err(BrokerError::PublishTimeout {
                    queue: queue.to_string(),
                    timeout,
                });
            }

            self.inner.queue(queue).push(Message {
                payload: payload.to_vec(),
                redelivered: false,
            });
            self.inner.published.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn consume<'a>(&'a self, queue: &'a str) -> BrokerFuture<'a, DeliveryStream> {
        let inner = Arc::clone(&self.inner);
        inner.consumes.fetch_add(1, Ordering::SeqCst);
        let queue = inner.queue(queue);
        Box::pin(async move {
            let stream = async_stream::stream! {
                while queue.is_open() {
                    match queue.pop() {
                        Some(message) => yield Ok(inner.delivery(&queue, message)),
                        None => queue.notify.notified().await,
                    }
                }
            };
            Ok(Box::pin(stream) as DeliveryStream)
        })
    }
}
