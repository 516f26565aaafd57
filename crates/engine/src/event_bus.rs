//! Event bus - typed publish/subscribe for domain events
//!
//! Subscribers register either for one concrete event struct
//! ([`EventBus::subscribe`]) or for every event ([`EventBus::subscribe_all`]).
//! Dispatch is keyed by [`EventKind`], so no runtime type lookup is involved.
//!
//! Handlers run synchronously on the publishing task, in subscription order.
//! The subscriber list is snapshotted before dispatch, so a handler may
//! subscribe or unsubscribe without deadlocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::types::{DomainEvent, EventKind, GameEvent};

/// Handle returned by subscribe, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&GameEvent) + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    /// `None` receives every event
    kind: Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Subscription { id, kind, handler });
        id
    }

    /// Subscribe to one event type
    pub fn subscribe<E, F>(&self, handler: F) -> SubscriptionId
    where
        E: DomainEvent,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.add(
            Some(E::KIND),
            Arc::new(move |event: &GameEvent| {
                if let Some(inner) = E::from_event(event) {
                    handler(inner);
                }
            }),
        )
    }

    /// Subscribe to every event
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameEvent) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(handler))
    }

    /// Returns false if the id was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Publish a concrete event
    pub fn publish<E: DomainEvent>(&self, event: E) {
        self.publish_event(event.into());
    }

    /// Publish an already-wrapped event
    pub fn publish_event(&self, event: GameEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .lock()
            .iter()
            .filter(|s| s.kind.map_or(true, |k| k == kind))
            .map(|s| Arc::clone(&s.handler))
            .collect();

        trace!(event = kind.as_str(), handlers = handlers.len(), "publish");
        for handler in handlers {
            handler(&event);
        }
    }

    /// Drop every subscription
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
