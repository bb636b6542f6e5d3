//! Session event bus.

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use super::events::{AppEvent, EventCategory};
use crate::data::FieldKey;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Which events a handler receives.
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    #[default]
    All,
    /// Events in any of these categories.
    Categories(Vec<EventCategory>),
    /// Events about one field, following it across its rekey.
    Field(FieldKey),
}

impl EventFilter {
    pub fn matches(&self, event: &AppEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
            EventFilter::Field(key) => event.concerns(*key),
        }
    }

    /// The filter to keep using once a followed local field has an id.
    fn rekeyed(&self, event: &AppEvent) -> Option<EventFilter> {
        let EventFilter::Field(FieldKey::Local(local)) = self else {
            return None;
        };
        match event {
            AppEvent::Field(super::FieldEvent::Rekeyed { local: from, id }) if from == local => {
                Some(EventFilter::Field(FieldKey::Remote(*id)))
            }
            _ => None,
        }
    }
}

type EventHandler = Box<dyn Fn(&AppEvent) + Send + Sync>;

struct Subscription {
    filter: EventFilter,
    handler: EventHandler,
}

#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Capacity of the broadcast channel behind [`EventBus::receiver`].
    pub channel_capacity: usize,
    /// Keep published events for diagnostics.
    pub enable_history: bool,
    pub max_history_size: usize,
    pub history_retention: Duration,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            enable_history: false,
            max_history_size: 500,
            history_retention: Duration::minutes(5),
        }
    }
}

/// A published event as kept in history.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Publication order within the bus, starting at 1.
    pub seq: u64,
    pub event: AppEvent,
    pub at: DateTime<Utc>,
}

/// Publish/subscribe channel owned by one placement session.
///
/// Handlers run synchronously on the publishing thread, in subscription
/// order. A handler must not subscribe or unsubscribe on the same bus.
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
    subscriptions: RwLock<BTreeMap<SubscriptionId, Subscription>>,
    history: Mutex<VecDeque<RecordedEvent>>,
    next_subscription: AtomicU64,
    next_seq: AtomicU64,
    config: EventBusConfig,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    pub fn with_config(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            subscriptions: RwLock::new(BTreeMap::new()),
            history: Mutex::new(VecDeque::new()),
            next_subscription: AtomicU64::new(1),
            next_seq: AtomicU64::new(1),
            config,
        }
    }

    /// Delivers an event to matching handlers and async receivers.
    ///
    /// Returns how many listeners got it; zero is not an error.
    pub fn publish(&self, event: AppEvent) -> usize {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("event #{}: {}", seq, event.description());

        if self.config.enable_history {
            self.record(seq, &event);
        }

        let mut delivered = 0;
        let mut follow = Vec::new();
        {
            let subscriptions = self.subscriptions.read();
            for (id, sub) in subscriptions.iter() {
                if sub.filter.matches(&event) {
                    (sub.handler)(&event);
                    delivered += 1;
                }
                if let Some(filter) = sub.filter.rekeyed(&event) {
                    follow.push((*id, filter));
                }
            }
        }
        if !follow.is_empty() {
            let mut subscriptions = self.subscriptions.write();
            for (id, filter) in follow {
                if let Some(sub) = subscriptions.get_mut(&id) {
                    tracing::debug!("Subscription {} now follows {:?}", id, filter);
                    sub.filter = filter;
                }
            }
        }

        delivered + self.sender.send(event).unwrap_or(0)
    }

    /// Fire-and-forget form of [`publish`](Self::publish).
    pub fn emit(&self, event: AppEvent) {
        self.publish(event);
    }

    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().insert(
            id,
            Subscription {
                filter,
                handler: Box::new(handler),
            },
        );
        tracing::debug!("Subscription {} added", id);
        id
    }

    /// Returns false when the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscriptions.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Subscription {} removed", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// A receiver for async listeners. Lagging receivers lose the oldest
    /// events.
    pub fn receiver(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Retained events published after `after_seq`, oldest first.
    pub fn history_since(&self, after_seq: u64) -> Vec<RecordedEvent> {
        self.history
            .lock()
            .iter()
            .filter(|e| e.seq > after_seq)
            .cloned()
            .collect()
    }

    /// Retained events about one field, including those under its local id.
    pub fn field_history(&self, key: FieldKey) -> Vec<RecordedEvent> {
        let history = self.history.lock();
        let mut keys = vec![key];
        for recorded in history.iter() {
            if let AppEvent::Field(super::FieldEvent::Rekeyed { local, id }) = &recorded.event {
                if key == FieldKey::Remote(*id) {
                    keys.push(FieldKey::Local(*local));
                }
            }
        }
        history
            .iter()
            .filter(|e| keys.iter().any(|k| e.event.concerns(*k)))
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    fn record(&self, seq: u64, event: &AppEvent) {
        let now = Utc::now();
        let mut history = self.history.lock();
        history.push_back(RecordedEvent {
            seq,
            event: event.clone(),
            at: now,
        });

        let retention = self.config.history_retention;
        while history
            .front()
            .is_some_and(|e| now.signed_duration_since(e.at) > retention)
        {
            history.pop_front();
        }
        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("published", &(self.next_seq.load(Ordering::Relaxed) - 1))
            .field("history", &self.config.enable_history)
            .finish()
    }
}
