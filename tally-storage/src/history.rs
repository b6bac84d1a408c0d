//! Per-session conversation history with a fixed capacity.
//!
//! Each session keeps at most `capacity` exchanges; appending past that
//! evicts the oldest. Sessions that go quiet can be dropped with
//! [`HistoryRing::prune_idle`].

use dashmap::DashMap;
use std::collections::VecDeque;
use tally_core::{AssistantConfig, ChatExchange, Timestamp};
use tracing::debug;

#[derive(Debug)]
pub struct HistoryRing {
    sessions: DashMap<String, VecDeque<ChatExchange>>,
    capacity: usize,
}

impl HistoryRing {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(config.history_capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an exchange, evicting the oldest ones past capacity.
    /// Returns how many were evicted.
    pub fn append(&self, session_id: &str, exchange: ChatExchange) -> usize {
        let mut ring = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));

        let mut evicted = 0;
        while ring.len() >= self.capacity {
            ring.pop_front();
            evicted += 1;
        }
        ring.push_back(exchange);

        if evicted > 0 {
            debug!(session_id = session_id, evicted = evicted, "History ring evicted oldest exchanges");
        }
        evicted
    }

    /// Most recent `n` exchanges, oldest first.
    pub fn window(&self, session_id: &str, n: usize) -> Vec<ChatExchange> {
        self.sessions
            .get(session_id)
            .map(|ring| {
                let skip = ring.len().saturating_sub(n);
                ring.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Whole retained history, oldest first.
    pub fn history(&self, session_id: &str) -> Vec<ChatExchange> {
        self.window(session_id, self.capacity)
    }

    pub fn len(&self, session_id: &str) -> usize {
        self.sessions.get(session_id).map(|ring| ring.len()).unwrap_or(0)
    }

    /// Forget a session. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drop sessions whose latest exchange is more than `max_idle` before `now`.
    /// Returns how many were dropped.
    pub fn prune_idle(&self, now: Timestamp, max_idle: chrono::Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, ring| {
            ring.back()
                .map(|latest| now - latest.timestamp <= max_idle)
                .unwrap_or(false)
        });
        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            debug!(pruned = pruned, "Pruned idle sessions");
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use tally_core::Category;

    fn exchange(session: &str, i: usize, secs: i64) -> ChatExchange {
        ChatExchange::user(
            session,
            format!("message {}", i),
            Category::General,
            DateTime::from_timestamp(secs, 0).unwrap(),
        )
    }

    #[test]
    fn test_cap_keeps_most_recent_in_order() {
        let ring = HistoryRing::new(20);
        let mut evicted = 0;
        for i in 1..=22 {
            evicted += ring.append("s", exchange("s", i, i as i64));
        }
        assert_eq!(evicted, 2);

        let history = ring.history("s");
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].text, "message 3");
        assert_eq!(history[19].text, "message 22");
    }

    #[test]
    fn test_window_is_recent_and_non_mutating() {
        let ring = HistoryRing::new(20);
        for i in 1..=5 {
            ring.append("s", exchange("s", i, 0));
        }
        let window = ring.window("s", 2);
        let texts: Vec<&str> = window.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["message 4", "message 5"]);
        assert_eq!(ring.len("s"), 5);
        assert_eq!(ring.window("s", 50).len(), 5);
        assert!(ring.window("unknown", 3).is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let ring = HistoryRing::new(3);
        ring.append("a", exchange("a", 1, 0));
        ring.append("b", exchange("b", 1, 0));
        assert_eq!(ring.session_count(), 2);
        assert!(ring.clear("a"));
        assert!(!ring.clear("a"));
        assert_eq!(ring.len("b"), 1);
    }

    #[test]
    fn test_prune_idle() {
        let ring = HistoryRing::new(5);
        ring.append("old", exchange("old", 1, 0));
        ring.append("recent", exchange("recent", 1, 500));
        let now = DateTime::from_timestamp(700, 0).unwrap();

        assert_eq!(ring.prune_idle(now, Duration::seconds(300)), 1);
        assert_eq!(ring.session_count(), 1);
        assert_eq!(ring.len("recent"), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let ring = HistoryRing::new(0);
        ring.append("s", exchange("s", 1, 0));
        ring.append("s", exchange("s", 2, 0));
        assert_eq!(ring.history("s").len(), 1);
        assert_eq!(ring.capacity(), 1);
    }
}
