use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;

use crate::broker::message::Message;

pub type SubscriberId = String;

/// A topic and the channels of its subscribers.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashMap<SubscriberId, UnboundedSender<Message>>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashMap::new(),
        }
    }

    /// Adds a subscriber. Re-using an id replaces its channel.
    pub fn subscribe(&mut self, id: SubscriberId, sender: UnboundedSender<Message>) {
        self.subscribers.insert(id, sender);
    }

    pub fn unsubscribe(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Sends `message` to every subscriber and drops those whose receiving
    /// end is gone. Returns the number of successful deliveries.
    pub fn deliver(&mut self, message: &Message) -> usize {
        self.subscribers
            .retain(|_, sender| sender.send(message.clone()).is_ok());
        self.subscribers.len()
    }

    pub fn prune_closed(&mut self) {
        self.subscribers.retain(|_, sender| !sender.is_closed());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
