use std::{collections::HashMap, sync::Arc};

use crate::{ClientKey, TopicKey, internal::Handler};

/// Topic -> client -> handler.
///
/// Not synchronized; the bus owns it behind a single lock.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    topics: HashMap<TopicKey, HashMap<ClientKey, Arc<Handler>>>,
}

impl Registry {
    /// Store a handler, returning the one it replaced.
    pub fn insert(&mut self, topic: TopicKey, handler: Handler) -> Option<Arc<Handler>> {
        self.topics
            .entry(topic)
            .or_default()
            .insert(handler.client().clone(), Arc::new(handler))
    }

    pub fn remove(&mut self, topic: &TopicKey, client: &ClientKey) -> bool {
        let Some(clients) = self.topics.get_mut(topic) else {
            return false;
        };
        let removed = clients.remove(client).is_some();
        if clients.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    /// Remove the client from every topic, returning how many entries went away.
    pub fn remove_client(&mut self, client: &ClientKey) -> usize {
        let mut removed = 0;
        self.topics.retain(|_, clients| {
            if clients.remove(client).is_some() {
                removed += 1;
            }
            !clients.is_empty()
        });
        removed
    }

    /// Handlers currently registered for the topic.
    pub fn snapshot(&self, topic: &TopicKey) -> Vec<Arc<Handler>> {
        self.topics
            .get(topic)
            .map(|clients| clients.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, topic: &TopicKey) -> usize {
        self.topics.get(topic).map_or(0, HashMap::len)
    }

    pub fn contains(&self, topic: &TopicKey, client: &ClientKey) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|clients| clients.contains_key(client))
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}
