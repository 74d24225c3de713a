//! Message - Dispatcher input
//!
//! The unit of delivery handed to `Send` and passed through to backends.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message identity, used as the idempotency key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap a caller-supplied identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identity (ULID, lexicographically sortable)
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Outgoing message
///
/// Fields are private: a message cannot change after it is built. The
/// `with_*` methods consume the value and return a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Caller-supplied identity; generated at dispatch time when absent
    #[serde(default)]
    id: Option<MessageId>,

    /// Sender address
    #[serde(default)]
    from: Option<String>,

    /// Destination address
    to: String,

    subject: String,

    #[serde(default)]
    body: String,

    /// Opaque payload, never inspected by the dispatcher
    #[serde(default)]
    payload: Bytes,
}

impl Message {
    /// Create a message without identity, sender or payload
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            from: None,
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            payload: Bytes::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Resolve the identity, generating one if the caller left it empty
    ///
    /// The returned message always carries the returned identity.
    pub fn into_identified(mut self) -> (MessageId, Self) {
        let id = self.id.get_or_insert_with(MessageId::generate).clone();
        (id, self)
    }

    pub fn id(&self) -> Option<&MessageId> {
        self.id.as_ref()
    }

    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_identified_keeps_caller_id() {
        let message = Message::new("rcpt@example.com", "hi", "body").with_id("order-42");
        let (id, message) = message.into_identified();
        assert_eq!(id.as_str(), "order-42");
        assert_eq!(message.id(), Some(&id));
    }

    #[test]
    fn test_into_identified_generates_unique_ids() {
        let (a, message_a) = Message::new("a@example.com", "s", "b").into_identified();
        let (b, _) = Message::new("a@example.com", "s", "b").into_identified();
        assert_ne!(a, b);
        assert_eq!(message_a.id(), Some(&a));
        assert_eq!(a.as_str().len(), 26);
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{ "to": "rcpt@example.com", "subject": "Test Email" }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.to(), "rcpt@example.com");
        assert!(message.id().is_none());
        assert!(message.body().is_empty());
        assert!(message.payload().is_empty());
    }
}
