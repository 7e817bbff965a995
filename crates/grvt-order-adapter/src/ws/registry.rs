/*
[INPUT]:  Subscribe/unsubscribe calls, acknowledgments and connection loss
[OUTPUT]: Logical subscription states independent of any socket
[POS]:    WebSocket layer - subscription registry
[UPDATE]: When subscription lifecycle rules change
*/

use std::collections::BTreeMap;
use std::fmt;

use crate::ws::events::ConnectionKind;

/// Identity of a logical subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    pub channel: String,
    pub selectors: Vec<String>,
}

impl SubscriptionKey {
    pub fn new(channel: impl Into<String>, selectors: Vec<String>) -> Self {
        Self {
            channel: channel.into(),
            selectors,
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.channel, self.selectors.join(","))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Waiting for a connection or an acknowledgment
    Pending,
    /// Acknowledged on the current connection
    Active,
    /// Kept across shutdown, revived by restart
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionEntry {
    pub key: SubscriptionKey,
    pub connection: ConnectionKind,
    pub state: SubscriptionState,
    /// Id of the subscribe frame awaiting acknowledgment
    pub request_id: Option<u64>,
}

impl SubscriptionEntry {
    /// Pending and not yet sent on the current connection
    pub fn needs_send(&self) -> bool {
        self.state == SubscriptionState::Pending && self.request_id.is_none()
    }
}

/// Subscription registry shared by the public API and the connection workers
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: BTreeMap<SubscriptionKey, SubscriptionEntry>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or reactivate a subscription. Returns true when a subscribe frame should be sent.
    pub fn upsert(&mut self, key: SubscriptionKey, connection: ConnectionKind) -> bool {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| SubscriptionEntry {
                key,
                connection,
                state: SubscriptionState::Pending,
                request_id: None,
            });
        if entry.state == SubscriptionState::Stale {
            entry.state = SubscriptionState::Pending;
            entry.request_id = None;
        }
        entry.needs_send()
    }

    pub fn remove(&mut self, key: &SubscriptionKey) -> Option<SubscriptionEntry> {
        self.entries.remove(key)
    }

    pub fn next_request_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Allocate an id for `key` if it still needs a subscribe frame
    pub fn claim_send(&mut self, key: &SubscriptionKey) -> Option<u64> {
        let needs_send = self.entries.get(key).is_some_and(SubscriptionEntry::needs_send);
        if !needs_send {
            return None;
        }
        let id = self.next_request_id();
        if let Some(entry) = self.entries.get_mut(key) {
            entry.request_id = Some(id);
        }
        Some(id)
    }

    /// Claim every subscription of `connection` for a fresh socket
    pub fn claim_all(&mut self, connection: ConnectionKind) -> Vec<(SubscriptionKey, u64)> {
        let keys: Vec<SubscriptionKey> = self
            .entries
            .values()
            .filter(|entry| entry.connection == connection && entry.needs_send())
            .map(|entry| entry.key.clone())
            .collect();
        keys.into_iter()
            .filter_map(|key| self.claim_send(&key).map(|id| (key, id)))
            .collect()
    }

    /// Mark the subscription awaiting `id` active
    pub fn acknowledge(&mut self, id: u64) -> Option<SubscriptionKey> {
        let entry = self
            .entries
            .values_mut()
            .find(|entry| entry.request_id == Some(id) && entry.state == SubscriptionState::Pending)?;
        entry.state = SubscriptionState::Active;
        entry.request_id = None;
        Some(entry.key.clone())
    }

    /// A rejected subscribe stays pending. Nothing resends it until the next
    /// connection or an explicit `upsert` of the same key.
    pub fn reject(&mut self, id: u64) -> Option<SubscriptionKey> {
        let entry = self
            .entries
            .values_mut()
            .find(|entry| entry.request_id == Some(id))?;
        entry.state = SubscriptionState::Pending;
        entry.request_id = None;
        Some(entry.key.clone())
    }

    /// Connection lost: every bound subscription goes back to pending
    pub fn revert(&mut self, connection: ConnectionKind) {
        for entry in self.entries.values_mut() {
            if entry.connection == connection && entry.state != SubscriptionState::Stale {
                entry.state = SubscriptionState::Pending;
                entry.request_id = None;
            }
        }
    }

    pub fn mark_all_stale(&mut self) {
        for entry in self.entries.values_mut() {
            entry.state = SubscriptionState::Stale;
            entry.request_id = None;
        }
    }

    pub fn revive_all(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.state == SubscriptionState::Stale {
                entry.state = SubscriptionState::Pending;
            }
        }
    }

    pub fn get(&self, key: &SubscriptionKey) -> Option<&SubscriptionEntry> {
        self.entries.get(key)
    }

    pub fn has_connection(&self, connection: ConnectionKind) -> bool {
        self.entries.values().any(|entry| entry.connection == connection)
    }

    pub fn snapshot(&self) -> Vec<SubscriptionEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(channel: &str) -> SubscriptionKey {
        SubscriptionKey::new(channel, vec!["BTC_USDT_Perp".to_string()])
    }

    #[test]
    fn test_subscribe_ack_lifecycle() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.upsert(key("v1.ticker.s"), ConnectionKind::Public));

        let id = registry.claim_send(&key("v1.ticker.s")).unwrap();
        assert!(registry.claim_send(&key("v1.ticker.s")).is_none());

        assert_eq!(registry.acknowledge(id), Some(key("v1.ticker.s")));
        assert_eq!(
            registry.get(&key("v1.ticker.s")).unwrap().state,
            SubscriptionState::Active
        );
        assert!(!registry.upsert(key("v1.ticker.s"), ConnectionKind::Public));
    }

    #[test]
    fn test_unknown_ack_is_ignored() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(key("v1.trade"), ConnectionKind::Public);
        assert!(registry.acknowledge(99).is_none());
    }

    #[test]
    fn test_revert_only_touches_one_connection() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(key("v1.ticker.s"), ConnectionKind::Public);
        registry.upsert(key("v1.order"), ConnectionKind::Private);
        for (_, id) in registry.claim_all(ConnectionKind::Public) {
            registry.acknowledge(id);
        }
        for (_, id) in registry.claim_all(ConnectionKind::Private) {
            registry.acknowledge(id);
        }

        registry.revert(ConnectionKind::Public);

        assert_eq!(registry.get(&key("v1.ticker.s")).unwrap().state, SubscriptionState::Pending);
        assert_eq!(registry.get(&key("v1.order")).unwrap().state, SubscriptionState::Active);
        assert_eq!(registry.claim_all(ConnectionKind::Public).len(), 1);
    }

    #[test]
    fn test_reject_keeps_pending_until_next_connection() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(key("v1.mini.s"), ConnectionKind::Public);
        let id = registry.claim_send(&key("v1.mini.s")).unwrap();

        assert!(registry.reject(id).is_some());
        assert!(registry.reject(id).is_none());
        let entry = registry.get(&key("v1.mini.s")).unwrap();
        assert_eq!(entry.state, SubscriptionState::Pending);
        assert_eq!(entry.request_id, None);

        registry.revert(ConnectionKind::Public);
        assert!(registry.get(&key("v1.mini.s")).unwrap().needs_send());
    }

    #[test]
    fn test_subscribe_again_after_reject_resends() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(key("v1.mini.s"), ConnectionKind::Public);
        let first = registry.claim_send(&key("v1.mini.s")).unwrap();
        registry.reject(first);

        assert!(registry.upsert(key("v1.mini.s"), ConnectionKind::Public));
        let second = registry.claim_send(&key("v1.mini.s")).unwrap();
        assert_ne!(first, second);
        assert!(registry.acknowledge(first).is_none());
        assert_eq!(registry.acknowledge(second), Some(key("v1.mini.s")));
    }

    #[test]
    fn test_stale_and_revive() {
        let mut registry = SubscriptionRegistry::new();
        registry.upsert(key("a"), ConnectionKind::Public);
        registry.upsert(key("b"), ConnectionKind::Public);
        registry.mark_all_stale();
        assert!(registry.claim_all(ConnectionKind::Public).is_empty());

        registry.revive_all();
        assert_eq!(registry.claim_all(ConnectionKind::Public).len(), 2);
        assert_eq!(registry.len(), 2);
    }
}
