use crate::protocol::ChatEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    User,
    Assistant,
}

/// A single entry in the message list. Updates produce a new value with the
/// same id rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: Uuid,
    text: String,
    origin: Origin,
    is_pending: bool,
    created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(text: String, origin: Origin, is_pending: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            origin,
            is_pending,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), Origin::User, false)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text.into(), Origin::Assistant, false)
    }

    /// "Assistant is typing" placeholder.
    pub fn pending() -> Self {
        Self::new(String::new(), Origin::Assistant, true)
    }

    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_pending(&self) -> bool {
        self.is_pending
    }

    pub fn is_user(&self) -> bool {
        self.origin == Origin::User
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Ordered message list with at most one pending placeholder.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> Uuid {
        self.push(ChatMessage::user(text))
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) -> Uuid {
        self.push(ChatMessage::assistant(text))
    }

    /// Appends the typing placeholder. Returns `None` if one already exists.
    pub fn begin_pending(&mut self) -> Option<Uuid> {
        if self.pending().is_some() {
            return None;
        }
        Some(self.push(ChatMessage::pending()))
    }

    pub fn pending(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|message| message.is_pending)
    }

    /// Shows streamed text inside the placeholder.
    pub fn update_pending(&mut self, text: &str) -> bool {
        match self.pending_index() {
            Some(index) => {
                self.messages[index] = self.messages[index].with_text(text);
                true
            }
            None => false,
        }
    }

    /// Replaces the placeholder with the final assistant message. Appends when
    /// there is no placeholder.
    pub fn resolve_pending(&mut self, text: impl Into<String>) -> Uuid {
        let message = ChatMessage::assistant(text);
        let id = message.id;
        match self.pending_index() {
            Some(index) => self.messages[index] = message,
            None => self.messages.push(message),
        }
        id
    }

    pub fn fail_pending(&mut self, error: &str) -> Uuid {
        self.resolve_pending(format!("Sorry, I encountered an error: {error}"))
    }

    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::Partial(text) => {
                self.update_pending(text);
            }
            ChatEvent::Response(text) => {
                self.resolve_pending(text.clone());
            }
            ChatEvent::Error(err) => {
                self.fail_pending(&err.to_string());
            }
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn push(&mut self, message: ChatMessage) -> Uuid {
        let id = message.id;
        self.messages.push(message);
        id
    }

    fn pending_index(&self) -> Option<usize> {
        self.messages.iter().rposition(|message| message.is_pending)
    }
}
