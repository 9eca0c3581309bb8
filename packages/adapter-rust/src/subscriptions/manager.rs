//! Subscription fan-out: one producer stream, many independent consumers.
//!
//! A manager owns a single internal unbounded queue fed by [`publish`]
//! (`SubscriptionManager::publish`). One broadcast loop per manager drains
//! it and pushes each item onto every live subscriber's own unbounded
//! queue. Subscribers choose an *active* or *passive* mode at creation:
//! active subscribers tell the owning feature that a forward-only read
//! cursor should advance, passive ones observe without advancing it. The
//! aggregate `has_subscriptions` / `has_active_subscriptions` flags are
//! recomputed under the subscriber-set lock on every change, so they are
//! always consistent with the set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::context::CallContext;
use crate::spawn::{TaskSpawner, TokioSpawner};

// ---------------------------------------------------------------------------
// Observer hook
// ---------------------------------------------------------------------------

/// Hooks invoked when the subscriber set changes.
///
/// Adapters use these to start polling an upstream source when the first
/// subscriber appears and to stop when the last one goes away.
pub trait SubscriptionObserver: Send + Sync {
    fn on_subscription_added(&self, id: Uuid, active: bool) {
        let _ = (id, active);
    }

    fn on_subscription_removed(&self, id: Uuid, active: bool) {
        let _ = (id, active);
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SubscriptionObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// Manager internals
// ---------------------------------------------------------------------------

struct SubscriberEntry<T> {
    id: Uuid,
    active: bool,
    tx: mpsc::UnboundedSender<T>,
}

struct Shared<T> {
    subscribers: RwLock<Vec<SubscriberEntry<T>>>,
    has_subscriptions: AtomicBool,
    has_active_subscriptions: AtomicBool,
    shut_down: AtomicBool,
    observer: Arc<dyn SubscriptionObserver>,
}

impl<T> Shared<T> {
    /// Recomputes the aggregate flags. Callers hold the write lock on
    /// `subscribers`, which keeps flags and set contents consistent.
    fn recompute(&self, subscribers: &[SubscriberEntry<T>]) {
        self.has_subscriptions
            .store(!subscribers.is_empty(), Ordering::SeqCst);
        self.has_active_subscriptions
            .store(subscribers.iter().any(|s| s.active), Ordering::SeqCst);
    }

    fn remove(&self, id: Uuid) -> Option<(Uuid, bool)> {
        let removed = {
            let mut subscribers = self.subscribers.write();
            let position = subscribers.iter().position(|s| s.id == id)?;
            let entry = subscribers.remove(position);
            self.recompute(&subscribers);
            (entry.id, entry.active)
        };
        self.observer
            .on_subscription_removed(removed.0, removed.1);
        Some(removed)
    }
}

// ---------------------------------------------------------------------------
// SubscriptionManager
// ---------------------------------------------------------------------------

/// Single-producer/multi-consumer broadcast primitive.
///
/// Cloning yields another handle to the same manager.
pub struct SubscriptionManager<T: Clone + Send + 'static> {
    shared: Arc<Shared<T>>,
    publish_tx: mpsc::UnboundedSender<T>,
    shutdown: CancellationToken,
}

impl<T: Clone + Send + 'static> Clone for SubscriptionManager<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            publish_tx: self.publish_tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> SubscriptionManager<T> {
    /// Manager with the ambient tokio runtime and no observer.
    ///
    /// The broadcast loop starts immediately, so a runtime context must be
    /// current.
    #[must_use]
    pub fn new() -> Self {
        Self::with(&TokioSpawner, Arc::new(NoopObserver))
    }

    /// Manager with an explicit spawner and subscriber-set observer.
    #[must_use]
    pub fn with(spawner: &dyn TaskSpawner, observer: Arc<dyn SubscriptionObserver>) -> Self {
        let (publish_tx, mut publish_rx) = mpsc::unbounded_channel::<T>();
        let shared = Arc::new(Shared {
            subscribers: RwLock::new(Vec::new()),
            has_subscriptions: AtomicBool::new(false),
            has_active_subscriptions: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            observer,
        });
        let shutdown = CancellationToken::new();

        // Broadcast loop: one per manager, runs until shutdown. Cancellation
        // and closed queues end it quietly; a disposed subscriber is skipped
        // without affecting delivery to the rest.
        let loop_shared = Arc::clone(&shared);
        let loop_shutdown = shutdown.clone();
        spawner.spawn(Box::pin(async move {
            loop {
                let item = tokio::select! {
                    () = loop_shutdown.cancelled() => break,
                    item = publish_rx.recv() => match item {
                        Some(item) => item,
                        None => break,
                    },
                };
                // Snapshot under the read lock, deliver outside it so a
                // subscribe/dispose never waits on delivery.
                let targets: Vec<mpsc::UnboundedSender<T>> = loop_shared
                    .subscribers
                    .read()
                    .iter()
                    .map(|s| s.tx.clone())
                    .collect();
                for tx in targets {
                    // A closed queue means the subscriber was disposed
                    // between snapshot and delivery.
                    let _ = tx.send(item.clone());
                }
            }
            tracing::debug!("subscription broadcast loop stopped");
        }));

        Self {
            shared,
            publish_tx,
            shutdown,
        }
    }

    /// Registers a new subscriber and returns its consumer handle.
    pub fn subscribe(&self, ctx: &CallContext, active: bool) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        {
            let mut subscribers = self.shared.subscribers.write();
            subscribers.push(SubscriberEntry { id, active, tx });
            self.shared.recompute(&subscribers);
        }
        tracing::debug!(
            subscription = %id,
            active,
            client = ctx.client_id.as_deref().unwrap_or("-"),
            "subscription added"
        );
        self.shared.observer.on_subscription_added(id, active);
        Subscription {
            id,
            active,
            rx,
            shared: Arc::downgrade(&self.shared),
            live: true,
        }
    }

    /// Enqueues an item for broadcast. Never blocks the producer; a no-op
    /// once the manager is shut down.
    pub fn publish(&self, item: T) {
        if self.shared.shut_down.load(Ordering::SeqCst) {
            return;
        }
        metrics::counter!("gatewire_subscription_published_total").increment(1);
        let _ = self.publish_tx.send(item);
    }

    #[must_use]
    pub fn has_subscriptions(&self) -> bool {
        self.shared.has_subscriptions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn has_active_subscriptions(&self) -> bool {
        self.shared.has_active_subscriptions.load(Ordering::SeqCst)
    }

    /// Stops the broadcast loop and disposes every outstanding subscription.
    /// Items already delivered to subscriber queues remain consumable.
    pub fn shutdown(&self) {
        if self.shared.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        let removed: Vec<(Uuid, bool)> = {
            let mut subscribers = self.shared.subscribers.write();
            let entries = subscribers
                .drain(..)
                .map(|e| (e.id, e.active))
                .collect();
            self.shared.recompute(&subscribers);
            entries
        };
        for (id, active) in &removed {
            self.shared.observer.on_subscription_removed(*id, *active);
        }
        tracing::debug!(disposed = removed.len(), "subscription manager shut down");
    }
}

impl<T: Clone + Send + 'static> Default for SubscriptionManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A consumer's delivery queue plus its immutable active/passive mode.
///
/// Dropping the handle disposes the subscription.
pub struct Subscription<T> {
    id: Uuid,
    active: bool,
    rx: mpsc::UnboundedReceiver<T>,
    shared: Weak<Shared<T>>,
    live: bool,
}

impl<T> Subscription<T> {
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether this subscriber advances the producer's read cursor.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `false` once disposed, or once the manager shut down or went away.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
            && self.shared.upgrade().is_some_and(|shared| {
                shared.subscribers.read().iter().any(|s| s.id == self.id)
            })
    }

    /// Next delivered item, or `None` once the queue is closed and drained.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Removes this subscription from the manager and closes its queue for
    /// writing. Items already buffered stay readable through
    /// [`Subscription::next`].
    pub fn dispose(&mut self) {
        if !self.live {
            return;
        }
        self.live = false;
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> futures_util::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
