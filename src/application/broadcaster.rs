use crate::domain::event::PaymentEvent;
use crate::domain::payment::PaymentId;
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Events a subscriber may have queued before it is considered stalled.
pub const SUBSCRIPTION_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// One observer's view of a payment's event stream.
///
/// Owned by exactly one observer. Once the broadcaster drops it (explicit
/// unsubscribe or slow-consumer eviction), [`Subscription::recv`] returns
/// `None` after any already queued events; the two causes are not
/// distinguished. Dropping the subscription removes it from the registry.
pub struct Subscription {
    id: SubscriptionId,
    payment_id: PaymentId,
    receiver: mpsc::Receiver<Arc<PaymentEvent>>,
    registry: Weak<Registry>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("payment_id", &self.payment_id)
            .finish()
    }
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn payment_id(&self) -> PaymentId {
        self.payment_id
    }

    /// Waits for the next event, `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Arc<PaymentEvent>> {
        self.receiver.recv().await
    }

    /// Number of events queued and not yet received.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    fn close(&mut self) {
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            remove_sender(&registry, self.payment_id, self.id);
        }
    }
}

type Senders = HashMap<SubscriptionId, mpsc::Sender<Arc<PaymentEvent>>>;
type Registry = DashMap<PaymentId, Senders>;

/// Drops one sender and collects the payment's entry once it is empty.
fn remove_sender(registry: &Registry, payment_id: PaymentId, id: SubscriptionId) -> bool {
    let removed = match registry.get_mut(&payment_id) {
        Some(mut senders) => senders.remove(&id).is_some(),
        None => false,
    };
    registry.remove_if(&payment_id, |_, senders| senders.is_empty());
    removed
}

/// In-memory fan-out of payment events to their observers.
///
/// The registry is sharded by payment id, so operations on different
/// payments do not contend. Delivery never blocks: a subscriber whose queue
/// is full misses the event and is evicted.
pub struct EventBroadcaster {
    subscribers: Arc<Registry>,
    next_id: AtomicU64,
    capacity: usize,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::with_capacity(SUBSCRIPTION_CAPACITY)
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broadcaster whose subscription queues hold `capacity` events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self, payment_id: PaymentId) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        let total = {
            let mut senders = self.subscribers.entry(payment_id).or_default();
            senders.insert(id, sender);
            senders.len()
        };
        debug!(%payment_id, subscription = %id, total, "Subscriber registered");

        Subscription {
            id,
            payment_id,
            receiver,
            registry: Arc::downgrade(&self.subscribers),
        }
    }

    /// Removes the subscription and closes its queue. Safe to call on a
    /// subscription that was already evicted or unsubscribed.
    pub fn unsubscribe(&self, subscription: &mut Subscription) {
        if self.remove(subscription.payment_id, subscription.id) {
            debug!(
                payment_id = %subscription.payment_id,
                subscription = %subscription.id,
                "Subscriber removed"
            );
        }
        subscription.close();
    }

    /// Delivers `event` to every current subscriber of its payment and
    /// returns how many received it.
    pub fn broadcast(&self, event: PaymentEvent) -> usize {
        let payment_id = event.payment_id();
        let event = Arc::new(event);
        let mut delivered = 0;
        let mut dropped = Vec::new();

        if let Some(senders) = self.subscribers.get(&payment_id) {
            for (id, sender) in senders.iter() {
                match sender.try_send(Arc::clone(&event)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(%payment_id, subscription = %id, "Subscriber queue full, evicting");
                        dropped.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(%payment_id, subscription = %id, "Subscriber went away, removing");
                        dropped.push(*id);
                    }
                }
            }
        }

        // The shard guard is released by now; removal takes the write lock.
        for id in dropped {
            self.remove(payment_id, id);
        }

        debug!(%payment_id, status = %event.status(), delivered, "Event broadcast");
        delivered
    }

    pub fn subscriber_count(&self, payment_id: PaymentId) -> usize {
        self.subscribers
            .get(&payment_id)
            .map(|senders| senders.len())
            .unwrap_or(0)
    }

    pub fn is_registered(&self, subscription: &Subscription) -> bool {
        self.subscribers
            .get(&subscription.payment_id)
            .is_some_and(|senders| senders.contains_key(&subscription.id))
    }

    /// Payments with at least one live subscriber.
    pub fn tracked_payments(&self) -> usize {
        self.subscribers.len()
    }

    fn remove(&self, payment_id: PaymentId, id: SubscriptionId) -> bool {
        remove_sender(&self.subscribers, payment_id, id)
    }
}
