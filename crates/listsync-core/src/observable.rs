//! Latest-value broadcast with replay
//!
//! A [`Publisher`] owns one slot holding the most recent value plus a
//! registry of subscriber queues. [`Observable`] handles let any number of
//! consumers [`subscribe`](Observable::subscribe); each new subscriber is
//! seeded with the current value under the same lock that publishing
//! takes, so it sees that value first and every later one after it.
//!
//! Publishing never waits on subscribers. Under
//! [`BufferPolicy::DropOldest`] a slow subscriber loses its oldest pending
//! values instead of holding the writer back.

use crate::config::BufferPolicy;
use futures::stream::{self, Stream};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::Notify;

/// Writing end; dropping it closes every subscriber
pub struct Publisher<T: Clone> {
    shared: Arc<Shared<T>>,
}

/// Cloneable read handle
pub struct Observable<T: Clone> {
    shared: Arc<Shared<T>>,
}

/// One consumer's ordered view of published values
pub struct Subscriber<T> {
    queue: Arc<Queue<T>>,
}

struct Shared<T> {
    policy: BufferPolicy,
    state: Mutex<SlotState<T>>,
}

struct SlotState<T> {
    latest: Option<T>,
    subscribers: Vec<Weak<Queue<T>>>,
    closed: bool,
}

struct Queue<T> {
    pending: Mutex<Pending<T>>,
    notify: Notify,
}

struct Pending<T> {
    values: VecDeque<T>,
    lagged: u64,
    closed: bool,
}

impl<T> Queue<T> {
    fn new(seed: Option<T>, closed: bool) -> Self {
        Self {
            pending: Mutex::new(Pending {
                values: seed.into_iter().collect(),
                lagged: 0,
                closed,
            }),
            notify: Notify::new(),
        }
    }

    fn push(&self, value: T, policy: BufferPolicy) {
        let mut pending = self.pending.lock();
        if let BufferPolicy::DropOldest { capacity } = policy {
            while pending.values.len() >= capacity.max(1) {
                pending.values.pop_front();
                pending.lagged += 1;
            }
        }
        pending.values.push_back(value);
        drop(pending);
        self.notify.notify_one();
    }

    fn close(&self) {
        self.pending.lock().closed = true;
        self.notify.notify_one();
    }
}

impl<T: Clone> Publisher<T> {
    /// Create publisher with no value yet
    #[must_use]
    pub fn new(policy: BufferPolicy) -> Self {
        Self::from_slot(policy, None)
    }

    /// Create publisher whose slot already holds `initial`
    #[must_use]
    pub fn with_initial(policy: BufferPolicy, initial: T) -> Self {
        Self::from_slot(policy, Some(initial))
    }

    fn from_slot(policy: BufferPolicy, latest: Option<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                policy,
                state: Mutex::new(SlotState {
                    latest,
                    subscribers: Vec::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Store `value` and hand it to every live subscriber
    pub fn publish(&self, value: T) {
        let mut state = self.shared.state.lock();
        let policy = self.shared.policy;
        state.subscribers.retain(|weak| match weak.upgrade() {
            Some(queue) => {
                queue.push(value.clone(), policy);
                true
            }
            None => false,
        });
        state.latest = Some(value);
    }

    /// Read handle for this publisher
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        Observable {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Most recently published value
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.shared.state.lock().latest.clone()
    }

    /// Subscribe directly from the writing end
    #[must_use]
    pub fn subscribe(&self) -> Subscriber<T> {
        self.shared.subscribe()
    }
}

impl<T: Clone> Drop for Publisher<T> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.closed = true;
        for queue in state.subscribers.drain(..).filter_map(|weak| weak.upgrade()) {
            queue.close();
        }
    }
}

impl<T: Clone> Shared<T> {
    fn subscribe(&self) -> Subscriber<T> {
        let mut state = self.state.lock();
        let queue = Arc::new(Queue::new(state.latest.clone(), state.closed));
        if !state.closed {
            state.subscribers.push(Arc::downgrade(&queue));
        }
        Subscriber { queue }
    }
}

impl<T: Clone> Observable<T> {
    /// Subscribe, starting with the current value if there is one
    #[must_use]
    pub fn subscribe(&self) -> Subscriber<T> {
        self.shared.subscribe()
    }

    /// Most recently published value
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.shared.state.lock().latest.clone()
    }

    /// Whether the publisher is gone
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Number of subscribers still attached
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .state
            .lock()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl<T: Clone> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Subscriber<T> {
    /// Wait for the next value
    ///
    /// Returns `None` once the publisher is dropped and every pending
    /// value has been read.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            {
                let mut pending = self.queue.pending.lock();
                if let Some(value) = pending.values.pop_front() {
                    return Some(value);
                }
                if pending.closed {
                    return None;
                }
            }
            self.queue.notify.notified().await;
        }
    }

    /// Take the next pending value without waiting
    pub fn try_next(&mut self) -> Option<T> {
        self.queue.pending.lock().values.pop_front()
    }

    /// Drain every pending value without waiting
    pub fn drain(&mut self) -> Vec<T> {
        self.queue.pending.lock().values.drain(..).collect()
    }

    /// Values discarded because this subscriber fell behind
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.queue.pending.lock().lagged
    }

    /// Whether no more values will arrive after the pending ones
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.queue.pending.lock().closed
    }

    /// Consume as a stream
    pub fn into_stream(self) -> impl Stream<Item = T>
    where
        T: Send,
    {
        stream::unfold(self, |mut subscriber| async move {
            let value = subscriber.next().await?;
            Some((value, subscriber))
        })
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Publisher")
            .field("policy", &self.shared.policy)
            .field("latest", &state.latest)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Observable")
            .field("latest", &state.latest)
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> fmt::Debug for Subscriber<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.queue.pending.lock();
        f.debug_struct("Subscriber")
            .field("pending", &pending.values.len())
            .field("lagged", &pending.lagged)
            .field("closed", &pending.closed)
            .finish()
    }
}
