use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::broker::message::Message;
use crate::broker::topic::SubscriberId;

/// Receiving end of a subscription to a single topic.
///
/// Dropping it closes the channel; the broker forgets the subscriber on the
/// next publish to that topic.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    topic: String,
    receiver: UnboundedReceiver<Message>,
}

impl Subscription {
    pub fn new(id: SubscriberId, topic: &str, receiver: UnboundedReceiver<Message>) -> Self {
        Self {
            id,
            topic: topic.to_string(),
            receiver,
        }
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next message. `None` once the broker side is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
