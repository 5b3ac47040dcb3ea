//! Chat messages and the per-conversation transcript.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// UI-only annotations (errors, notices). Never sent to the model.
    System,
}

impl Role {
    /// Upper-case label used in exported transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
            Self::System => "SYSTEM",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The `{role, content}` pair sent to the answering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for ContextMessage {
    fn from(m: &Message) -> Self {
        Self {
            role: m.role,
            content: m.content.clone(),
        }
    }
}

/// Session-wide message id source.
///
/// Clones share the counter, so transcripts created one after another in a
/// session never reuse an id.
#[derive(Debug, Clone, Default)]
pub struct MessageIds(Arc<AtomicU64>);

impl MessageIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id, starting at 1.
    pub fn next_id(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Ordered, append-only log of a conversation.
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    ids: MessageIds,
}

impl Transcript {
    pub fn new(ids: MessageIds) -> Self {
        Self {
            messages: Vec::new(),
            ids,
        }
    }

    /// Append a message and return a copy of it.
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> Message {
        let message = Message {
            id: self.ids.next_id(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        };
        self.messages.push(message.clone());
        message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The transcript as the model sees it: everything except system entries.
    pub fn context(&self) -> Vec<ContextMessage> {
        self.messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(ContextMessage::from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Remove every message. Ids keep counting up.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
