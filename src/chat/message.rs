//! Message records and the append-only conversation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person typing into the page.
    User,
    /// The remote assistant.
    Bot,
}

impl Sender {
    /// CSS class / wire name for this sender.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// A single message in the conversation.
///
/// Records are never edited in place. Streaming replaces the last record with
/// a new one carrying the concatenated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub sender: Sender,
    /// Markdown text.
    pub text: String,
}

impl Message {
    /// Create a user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    /// Create a bot message.
    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }

    /// Return a new record with `chunk` appended to the text.
    #[must_use]
    pub fn with_appended(&self, chunk: &str) -> Self {
        let mut text = String::with_capacity(self.text.len() + chunk.len());
        text.push_str(&self.text);
        text.push_str(chunk);
        Self {
            sender: self.sender,
            text,
        }
    }
}

/// Ordered, append-only list of messages.
///
/// Cloning is cheap: records are shared, so a clone is a snapshot that later
/// appends never touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Arc<Message>>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation opened by a bot greeting.
    #[must_use]
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(Message::bot(greeting));
        conversation
    }

    /// Append a message at the end.
    pub fn push(&mut self, message: Message) {
        self.messages.push(Arc::new(message));
    }

    /// Replace the last record with a copy carrying `chunk` appended.
    ///
    /// Returns `false` when the conversation is empty.
    pub fn append_to_last(&mut self, chunk: &str) -> bool {
        match self.messages.last_mut() {
            Some(last) => {
                *last = Arc::new(last.with_appended(chunk));
                true
            }
            None => false,
        }
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last().map(AsRef::as_ref)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate messages oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().map(AsRef::as_ref)
    }

    /// Shared record at `index`, for identity comparisons.
    #[cfg(test)]
    pub(crate) fn record(&self, index: usize) -> Option<&Arc<Message>> {
        self.messages.get(index)
    }

    /// Owned copy of every message.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Message> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_replaces_last_record() {
        let mut conversation = Conversation::with_greeting("hi");
        conversation.push(Message::bot(""));
        let before = Arc::clone(conversation.record(1).unwrap());

        assert!(conversation.append_to_last("Hel"));
        assert!(conversation.append_to_last("lo"));

        let after = conversation.record(1).unwrap();
        assert!(!Arc::ptr_eq(&before, after));
        assert_eq!(before.text, "");
        assert_eq!(after.text, "Hello");
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_append_to_empty_conversation() {
        let mut conversation = Conversation::new();
        assert!(!conversation.append_to_last("lost"));
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_appends() {
        let mut conversation = Conversation::new();
        conversation.push(Message::bot("a"));
        let snapshot = conversation.clone();

        conversation.append_to_last("b");
        conversation.push(Message::user("c"));

        assert_eq!(snapshot.to_vec(), vec![Message::bot("a")]);
        assert_eq!(conversation.last(), Some(&Message::user("c")));
    }

    #[test]
    fn test_sender_serialization() {
        let json = serde_json::to_string(&Message::user("x")).unwrap();
        assert_eq!(json, r#"{"sender":"user","text":"x"}"#);
    }
}
