use std::path::Path;

use chrono::Utc;
use sled::{Db, Tree};
use tracing::{debug, warn};

use crate::broker::message::Message;
use crate::utils::error::PersistenceError;

/// Tree names are prefixed so that no topic can alias sled's default tree.
const TREE_PREFIX: &str = "topic/";

/// Message history backed by sled.
///
/// Keys are ids from `Db::generate_id`, stored big-endian so that tree
/// iteration order is publication order.
#[derive(Clone)]
pub struct Persistence {
    db: Db,
    ttl_millis: Option<i64>,
    max_messages_per_topic: Option<usize>,
}

impl Persistence {
    pub fn open(
        path: impl AsRef<Path>,
        ttl_seconds: Option<u64>,
        max_messages_per_topic: Option<usize>,
    ) -> Result<Self, PersistenceError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            ttl_millis: ttl_seconds.map(|secs| (secs as i64).saturating_mul(1000)),
            max_messages_per_topic,
        })
    }

    pub fn store_message(&self, msg: &Message) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_vec(msg)?;
        let tree = self.tree(&msg.topic)?;
        let key = self.db.generate_id()?.to_be_bytes();
        tree.insert(key, serialized)?;
        self.trim(&tree)?;
        Ok(())
    }

    /// Returns the stored messages of `topic`, oldest first, after dropping
    /// the ones past their TTL.
    ///
    /// Reading never creates a tree; a tree left empty by expiry is dropped.
    pub fn load_messages(&self, topic: &str) -> Result<Vec<Message>, PersistenceError> {
        let name = tree_name(topic);
        if !self.db.tree_names().iter().any(|n| &n[..] == name.as_bytes()) {
            return Ok(Vec::new());
        }

        let tree = self.db.open_tree(&name)?;
        self.cleanup_old_messages(&tree)?;
        if tree.is_empty() {
            drop(tree);
            self.db.drop_tree(&name)?;
            return Ok(Vec::new());
        }

        let mut messages = Vec::new();
        for entry in tree.iter() {
            let (key, value) = entry?;
            match serde_json::from_slice::<Message>(&value) {
                Ok(msg) => messages.push(msg),
                Err(e) => warn!(topic, key = ?key, error = %e, "skipping unreadable stored message"),
            }
        }
        Ok(messages)
    }

    /// Topics that currently have a tree on disk, sorted.
    pub fn stored_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .db
            .tree_names()
            .iter()
            .filter_map(|name| {
                std::str::from_utf8(name)
                    .ok()?
                    .strip_prefix(TREE_PREFIX)
                    .map(str::to_string)
            })
            .collect();
        topics.sort();
        topics
    }

    pub fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }

    fn tree(&self, topic: &str) -> Result<Tree, PersistenceError> {
        Ok(self.db.open_tree(tree_name(topic))?)
    }

    fn cleanup_old_messages(&self, tree: &Tree) -> Result<(), PersistenceError> {
        let Some(ttl) = self.ttl_millis else {
            return Ok(());
        };
        let expiry_time = Utc::now().timestamp_millis() - ttl;

        let mut expired = Vec::new();
        for entry in tree.iter() {
            let (key, value) = entry?;
            let outdated = serde_json::from_slice::<Message>(&value)
                .map(|msg| msg.timestamp < expiry_time)
                .unwrap_or(true);
            if outdated {
                expired.push(key);
            }
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "removing expired messages");
        }
        for key in expired {
            tree.remove(key)?;
        }
        Ok(())
    }

    fn trim(&self, tree: &Tree) -> Result<(), PersistenceError> {
        let Some(max) = self.max_messages_per_topic else {
            return Ok(());
        };
        // newest first, everything past `max` goes
        let oldest: Vec<_> = tree
            .iter()
            .keys()
            .rev()
            .skip(max)
            .collect::<Result<_, _>>()?;
        for key in oldest {
            tree.remove(key)?;
        }
        Ok(())
    }
}

fn tree_name(topic: &str) -> String {
    format!("{TREE_PREFIX}{topic}")
}

impl std::fmt::Debug for Persistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persistence")
            .field("db", &"sled::Db")
            .field("ttl_millis", &self.ttl_millis)
            .field("max_messages_per_topic", &self.max_messages_per_topic)
            .finish()
    }
}
