//! Broker engine
//!
//! In-memory broker responsible for:
//! - managing topics and their subscriber channels
//! - fanning published messages out to every live subscriber
//! - persisting messages and replaying them to new subscribers, when a
//!   `Persistence` store is attached
//!
//! Concurrency and usage notes:
//! - All state sits behind one `std::sync::Mutex`; the broker is shared as
//!   `Arc<dyn Broker>` by the transport layer. Delivery only pushes onto
//!   unbounded channels, so the lock is never held across I/O on a socket.
//! - Storing a message happens under the same lock as its delivery, so a
//!   subscriber never sees a message twice through replay and fan-out.
//! - A topic lives in the map only while it has subscribers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::broker::Broker;
use crate::broker::message::Message;
use crate::broker::subscription::Subscription;
use crate::broker::topic::{SubscriberId, Topic};
use crate::config::BrokerSettings;
use crate::persistence::Persistence;
use crate::utils::error::{BrokerError, PersistenceError};

#[derive(Debug)]
pub struct InMemoryBroker {
    topics: Mutex<HashMap<String, Topic>>,
    persistence: Option<Persistence>,
    max_subscribers_per_topic: usize,
}

impl InMemoryBroker {
    pub const DEFAULT_MAX_SUBSCRIBERS: usize = 1000;

    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            persistence: None,
            max_subscribers_per_topic: Self::DEFAULT_MAX_SUBSCRIBERS,
        }
    }

    pub fn new_with_persistence(persistence: Persistence) -> Self {
        Self {
            persistence: Some(persistence),
            ..Self::new()
        }
    }

    /// Builds a broker from configuration, opening the sled store when a
    /// persistence path is configured.
    pub fn from_settings(settings: &BrokerSettings) -> Result<Self, PersistenceError> {
        let broker = match &settings.persistence_path {
            Some(path) => Self::new_with_persistence(Persistence::open(
                path,
                Some(settings.message_ttl_secs),
                Some(settings.max_messages_per_topic),
            )?),
            None => Self::new(),
        };
        Ok(broker.with_max_subscribers(settings.max_subscribers_per_topic))
    }

    pub fn with_max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers_per_topic = max;
        self
    }

    /// Removes a subscriber from a topic. Returns whether it was subscribed.
    pub fn unsubscribe(&self, topic: &str, subscriber: &SubscriberId) -> Result<bool, BrokerError> {
        let mut topics = self.lock()?;
        let Some(t) = topics.get_mut(topic) else {
            return Ok(false);
        };
        let removed = t.unsubscribe(subscriber);
        if t.subscriber_count() == 0 {
            topics.remove(topic);
        }
        Ok(removed)
    }

    /// Names of every topic with a live subscriber, sorted.
    pub fn topics(&self) -> Result<Vec<String>, BrokerError> {
        let mut topics = self.lock()?;
        sweep(&mut topics);
        let mut names: Vec<String> = topics.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn subscriber_count(&self, topic: &str) -> Result<usize, BrokerError> {
        Ok(self
            .lock()?
            .get(topic)
            .map_or(0, Topic::subscriber_count))
    }

    /// Flushes the persistence store, if any.
    pub fn flush(&self) -> Result<(), BrokerError> {
        if let Some(persistence) = &self.persistence {
            persistence.flush()?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Topic>>, BrokerError> {
        self.topics.lock().map_err(|_| BrokerError::Poisoned)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Drops closed subscribers, then topics left without any.
fn sweep(topics: &mut HashMap<String, Topic>) {
    topics.retain(|_, t| {
        t.prune_closed();
        t.subscriber_count() > 0
    });
}

fn validate_topic(topic: &str) -> Result<(), BrokerError> {
    if topic.is_empty() {
        return Err(BrokerError::InvalidTopic);
    }
    Ok(())
}

impl Broker for InMemoryBroker {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        validate_topic(topic)?;
        let message = Message::new(topic, payload);

        let mut topics = self.lock()?;
        if let Some(persistence) = &self.persistence {
            persistence.store_message(&message)?;
        }

        match topics.get_mut(topic) {
            Some(t) => {
                let delivered = t.deliver(&message);
                debug!(topic, message_id = %message.message_id, delivered, "published message");
                if delivered == 0 {
                    topics.remove(topic);
                }
            }
            None => debug!(topic, "topic has no subscribers"),
        }
        Ok(())
    }

    /// Creates the topic on first use. Stored messages are queued on the new
    /// subscription before it is returned.
    fn subscribe(&self, topic: &str) -> Result<Subscription, BrokerError> {
        validate_topic(topic)?;

        let mut topics = self.lock()?;
        sweep(&mut topics);
        let current = topics.get(topic).map_or(0, Topic::subscriber_count);
        if current >= self.max_subscribers_per_topic {
            return Err(BrokerError::SubscriberLimit {
                topic: topic.to_string(),
                limit: self.max_subscribers_per_topic,
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Some(persistence) = &self.persistence {
            for stored in persistence.load_messages(topic)? {
                // receiver is still in hand, send cannot fail
                let _ = tx.send(stored);
            }
        }

        let id = format!("subscriber-{}", Uuid::new_v4());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic))
            .subscribe(id.clone(), tx);
        debug!(topic, subscriber = %id, "subscribed");

        Ok(Subscription::new(id, topic, rx))
    }
}
