use futures_util::StreamExt;
use tempfile::tempdir;
use tokio::sync::mpsc;

use super::topic::Topic;
use super::{Broker, InMemoryBroker, Message};
use crate::config::BrokerSettings;
use crate::persistence::Persistence;
use crate::utils::error::BrokerError;

#[test]
fn test_topic_new() {
    let topic = Topic::new("test_topic");
    assert_eq!(topic.name, "test_topic");
    assert!(topic.subscribers.is_empty());
}

#[test]
fn test_topic_subscribe_and_unsubscribe() {
    let mut topic = Topic::new("test_topic");
    let (tx, _rx) = mpsc::unbounded_channel();
    topic.subscribe("client1".to_string(), tx);
    assert!(topic.subscribers.contains_key("client1"));

    assert!(topic.unsubscribe(&"client1".to_string()));
    assert!(!topic.unsubscribe(&"client1".to_string()));
    assert!(topic.subscribers.is_empty());
}

#[test]
fn test_topic_deliver_drops_closed_subscribers() {
    let mut topic = Topic::new("test_topic");
    let (open_tx, mut open_rx) = mpsc::unbounded_channel();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();
    topic.subscribe("open".to_string(), open_tx);
    topic.subscribe("closed".to_string(), closed_tx);
    drop(closed_rx);

    let delivered = topic.deliver(&Message::new("test_topic", b"hi".to_vec()));
    assert_eq!(delivered, 1);
    assert!(!topic.subscribers.contains_key("closed"));
    assert_eq!(open_rx.try_recv().unwrap().payload, b"hi".to_vec());
}

#[test]
fn test_broker_new() {
    let broker = InMemoryBroker::default();
    assert!(broker.topics().unwrap().is_empty());
    assert_eq!(broker.subscriber_count("anything").unwrap(), 0);
}

#[test]
fn test_broker_subscribe_creates_topic() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("test_topic").unwrap();

    assert_eq!(sub.topic(), "test_topic");
    assert!(sub.id().starts_with("subscriber-"));
    assert_eq!(broker.topics().unwrap(), vec!["test_topic".to_string()]);
    assert_eq!(broker.subscriber_count("test_topic").unwrap(), 1);
}

#[test]
fn test_broker_publish_fans_out() {
    let broker = InMemoryBroker::new();
    let mut first = broker.subscribe("test_topic").unwrap();
    let mut second = broker.subscribe("test_topic").unwrap();
    let mut other = broker.subscribe("other_topic").unwrap();

    broker.publish("test_topic", b"hello".to_vec()).unwrap();

    for sub in [&mut first, &mut second] {
        let received = sub.try_recv().expect("message delivered");
        assert_eq!(received.topic, "test_topic");
        assert_eq!(received.payload, b"hello".to_vec());
        assert!(!received.message_id.is_empty());
    }
    assert!(other.try_recv().is_none());
}

#[test]
fn test_publish_to_nonexistent_topic() {
    let broker = InMemoryBroker::new();
    broker.publish("nonexistent_topic", b"hello".to_vec()).unwrap();
    assert!(broker.topics().unwrap().is_empty());
}

#[test]
fn test_publish_empty_payload() {
    let broker = InMemoryBroker::new();
    let mut sub = broker.subscribe("test_topic").unwrap();
    broker.publish("test_topic", Vec::new()).unwrap();
    assert!(sub.try_recv().unwrap().payload.is_empty());
}

#[test]
fn test_empty_topic_is_rejected() {
    let broker = InMemoryBroker::new();
    assert!(matches!(
        broker.publish("", b"x".to_vec()),
        Err(BrokerError::InvalidTopic)
    ));
    assert!(matches!(broker.subscribe(""), Err(BrokerError::InvalidTopic)));
}

#[test]
fn test_dropped_subscription_is_forgotten() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("test_topic").unwrap();
    drop(sub);

    broker.publish("test_topic", b"hello".to_vec()).unwrap();
    assert_eq!(broker.subscriber_count("test_topic").unwrap(), 0);
}

#[test]
fn test_unsubscribe() {
    let broker = InMemoryBroker::new();
    let mut sub = broker.subscribe("test_topic").unwrap();
    let id = sub.id().clone();

    assert!(broker.unsubscribe("test_topic", &id).unwrap());
    assert!(!broker.unsubscribe("test_topic", &id).unwrap());
    assert!(!broker.unsubscribe("missing", &id).unwrap());

    broker.publish("test_topic", b"late".to_vec()).unwrap();
    assert!(sub.try_recv().is_none());
}

#[test]
fn test_subscriber_limit() {
    let broker = InMemoryBroker::new().with_max_subscribers(1);
    let first = broker.subscribe("test_topic").unwrap();

    let err = broker.subscribe("test_topic").unwrap_err();
    assert!(matches!(err, BrokerError::SubscriberLimit { limit: 1, .. }));

    // a dropped subscription frees its slot
    drop(first);
    assert!(broker.subscribe("test_topic").is_ok());
}

#[test]
fn test_replay_from_persistence() {
    let dir = tempdir().unwrap();
    let persistence = Persistence::open(dir.path(), None, None).unwrap();
    let broker = InMemoryBroker::new_with_persistence(persistence);

    broker.publish("test_topic", b"one".to_vec()).unwrap();
    broker.publish("test_topic", b"two".to_vec()).unwrap();

    let mut sub = broker.subscribe("test_topic").unwrap();
    assert_eq!(sub.try_recv().unwrap().payload, b"one".to_vec());
    assert_eq!(sub.try_recv().unwrap().payload, b"two".to_vec());
    assert!(sub.try_recv().is_none());

    broker.publish("test_topic", b"three".to_vec()).unwrap();
    assert_eq!(sub.try_recv().unwrap().payload, b"three".to_vec());
    assert!(sub.try_recv().is_none());
}

#[test]
fn test_from_settings_with_persistence() {
    let dir = tempdir().unwrap();
    let settings = BrokerSettings {
        max_subscribers_per_topic: 3,
        message_ttl_secs: 60,
        max_messages_per_topic: 1,
        persistence_path: Some(dir.path().to_string_lossy().into_owned()),
    };
    let broker = InMemoryBroker::from_settings(&settings).unwrap();

    broker.publish("test_topic", b"old".to_vec()).unwrap();
    broker.publish("test_topic", b"new".to_vec()).unwrap();
    broker.flush().unwrap();

    let mut sub = broker.subscribe("test_topic").unwrap();
    assert_eq!(sub.try_recv().unwrap().payload, b"new".to_vec());
    assert!(sub.try_recv().is_none());
}

#[tokio::test]
async fn test_subscription_is_a_stream() {
    let broker = InMemoryBroker::new();
    let mut sub = broker.subscribe("test_topic").unwrap();

    broker.publish("test_topic", b"a".to_vec()).unwrap();
    broker.publish("test_topic", b"b".to_vec()).unwrap();

    assert_eq!(sub.next().await.unwrap().payload, b"a".to_vec());
    assert_eq!(sub.recv().await.unwrap().payload, b"b".to_vec());
}

#[tokio::test]
async fn test_subscription_ends_when_broker_dropped() {
    let broker = InMemoryBroker::new();
    let mut sub = broker.subscribe("test_topic").unwrap();
    drop(broker);
    assert!(sub.next().await.is_none());
}

#[test]
fn test_topic_removed_once_last_subscriber_leaves() {
    let broker = InMemoryBroker::new();
    let sub = broker.subscribe("test_topic").unwrap();
    drop(sub);

    broker.publish("test_topic", b"hello".to_vec()).unwrap();
    assert!(broker.topics().unwrap().is_empty());

    let sub = broker.subscribe("test_topic").unwrap();
    let id = sub.id().clone();
    assert!(broker.unsubscribe("test_topic", &id).unwrap());
    assert!(broker.topics().unwrap().is_empty());
}

#[test]
fn test_dropped_subscriptions_do_not_accumulate() {
    let dir = tempdir().unwrap();
    let persistence = Persistence::open(dir.path(), None, None).unwrap();
    let broker = InMemoryBroker::new_with_persistence(persistence.clone());

    for i in 0..50 {
        drop(broker.subscribe(&format!("topic-{i}")).unwrap());
    }
    let live = broker.subscribe("live").unwrap();

    assert_eq!(broker.topics().unwrap(), vec!["live".to_string()]);
    assert!(persistence.stored_topics().is_empty());
    drop(live);
}

#[test]
fn test_rejected_subscribe_leaves_no_topic() {
    let broker = InMemoryBroker::new().with_max_subscribers(0);
    assert!(broker.subscribe("test_topic").is_err());
    assert!(broker.topics().unwrap().is_empty());
}
