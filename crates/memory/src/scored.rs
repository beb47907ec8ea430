//! Fixed-capacity scored message store.
//!
//! A circular buffer of `2 * max_pairs` slots. Appending past capacity
//! overwrites the oldest slot regardless of its importance; the token-budget
//! trim in [`crate::trim`] is a separate, softer bound.

use emberbot_core::message::{Role, ScoredMessage};

/// Default number of user/assistant pairs kept per session.
pub const DEFAULT_MAX_PAIRS: usize = 20;

/// Chronological ring of scored messages for one session.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    slots: Vec<ScoredMessage>,
    /// Index of the oldest entry once the ring is full.
    head: usize,
    capacity: usize,
}

impl ScoredMemory {
    /// A store holding at most `max_pairs` exchanges (`2 * max_pairs` messages).
    pub fn new(max_pairs: usize) -> Self {
        let capacity = max_pairs.max(1) * 2;
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Append a message, returning the evicted oldest entry if the ring was full.
    pub fn append(&mut self, role: Role, content: impl Into<String>, importance: u8) -> Option<ScoredMessage> {
        self.push(ScoredMessage::new(role, content, importance))
    }

    /// Append an already-scored message.
    pub fn push(&mut self, message: ScoredMessage) -> Option<ScoredMessage> {
        if self.slots.len() < self.capacity {
            self.slots.push(message);
            return None;
        }
        let evicted = std::mem::replace(&mut self.slots[self.head], message);
        self.head = (self.head + 1) % self.capacity;
        Some(evicted)
    }

    /// Iterate oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ScoredMessage> {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// All messages, oldest first.
    pub fn all(&self) -> Vec<ScoredMessage> {
        self.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl Default for ScoredMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAIRS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(mem: &ScoredMemory) -> Vec<String> {
        mem.iter().map(|m| m.content().to_string()).collect()
    }

    #[test]
    fn append_in_order() {
        let mut mem = ScoredMemory::new(2);
        mem.append(Role::User, "a", 1);
        mem.append(Role::Assistant, "b", 1);
        assert_eq!(contents(&mem), vec!["a", "b"]);
        assert_eq!(mem.capacity(), 4);
    }

    #[test]
    fn oldest_evicted_regardless_of_importance() {
        let mut mem = ScoredMemory::new(1);
        assert!(mem.append(Role::User, "important", 10).is_none());
        assert!(mem.append(Role::Assistant, "reply", 10).is_none());
        let evicted = mem.append(Role::User, "filler", 0).unwrap();
        assert_eq!(evicted.content(), "important");
        assert_eq!(contents(&mem), vec!["reply", "filler"]);
    }

    #[test]
    fn wraps_many_times_and_stays_chronological() {
        let mut mem = ScoredMemory::new(2);
        for i in 0..11 {
            mem.append(Role::User, i.to_string(), 5);
        }
        assert_eq!(mem.len(), 4);
        assert_eq!(contents(&mem), vec!["7", "8", "9", "10"]);
    }

    #[test]
    fn clear_resets() {
        let mut mem = ScoredMemory::new(1);
        for i in 0..3 {
            mem.append(Role::User, i.to_string(), 1);
        }
        mem.clear();
        assert!(mem.is_empty());
        mem.append(Role::User, "fresh", 1);
        assert_eq!(contents(&mem), vec!["fresh"]);
    }
}
