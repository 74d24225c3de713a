//! IdempotencyGuard - at-most-once admission per message identity

use std::collections::HashSet;

use contracts::MessageId;

/// Set of identities already admitted for dispatch
///
/// Insert-only, unbounded for the dispatcher's lifetime. The guard is owned
/// by the dispatcher worker, so `admit` is serialized with every other
/// state change.
#[derive(Debug, Default)]
pub struct IdempotencyGuard {
    seen: HashSet<MessageId>,
}

impl IdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`; returns false if it was admitted before
    pub fn admit(&mut self, id: &MessageId) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.clone())
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_admit_rejected() {
        let mut guard = IdempotencyGuard::new();
        let id = MessageId::new("unique-email-id");

        assert!(guard.admit(&id));
        assert!(!guard.admit(&id));
        assert!(!guard.admit(&MessageId::new("unique-email-id")));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_distinct_ids_admitted() {
        let mut guard = IdempotencyGuard::new();
        assert!(guard.admit(&MessageId::new("a")));
        assert!(guard.admit(&MessageId::new("b")));
        assert!(guard.contains(&MessageId::new("a")));
        assert!(!guard.contains(&MessageId::new("c")));
    }
}
