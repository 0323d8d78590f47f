//! Transcript types shared by the pipeline and the UI
//!
//! The store keeps messages newest first. Nothing here knows about the
//! terminal or the network.

use chrono::{DateTime, Local};
use uuid::Uuid;

pub type MessageId = Uuid;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    System,
}

/// Where a message is in its correction lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionState {
    Pending,
    Corrected,
    Failed(String),
    /// A later send in the same debounce window took this message's request slot.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct Message {
    id: MessageId,
    created_at: DateTime<Local>,
    author: Author,
    original_text: String,
    corrected_text: Option<String>,
    state: CorrectionState,
}

impl Message {
    /// A pending message holding exactly what the user typed.
    pub fn from_user(text: &str) -> Self {
        Self::new(Author::User, text)
    }

    /// An informational line from the app itself. Notices are never corrected.
    pub fn notice(text: &str) -> Self {
        Self::new(Author::System, text)
    }

    fn new(author: Author, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Local::now(),
            author,
            original_text: text.to_string(),
            corrected_text: None,
            state: CorrectionState::Pending,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn author(&self) -> Author {
        self.author
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn corrected_text(&self) -> Option<&str> {
        self.corrected_text.as_deref()
    }

    pub fn state(&self) -> &CorrectionState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.corrected_text.is_none()
    }

    /// Still waiting on the network, as opposed to failed or superseded.
    pub fn is_awaiting(&self) -> bool {
        self.author == Author::User && self.state == CorrectionState::Pending
    }

    fn set_correction(&mut self, text: &str) -> bool {
        if self.corrected_text.is_some() || self.author != Author::User {
            return false;
        }
        self.corrected_text = Some(text.to_string());
        self.state = CorrectionState::Corrected;
        true
    }

    fn set_state(&mut self, state: CorrectionState) -> bool {
        if self.corrected_text.is_some() {
            return false;
        }
        self.state = state;
        true
    }
}

/// Ordered transcript, newest message first.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head.
    pub fn append(&mut self, message: Message) {
        self.messages.insert(0, message);
    }

    /// Set the correction on the most recently appended user message that
    /// has none yet. Does nothing when every message is already corrected.
    pub fn update_latest_correction(&mut self, text: &str) {
        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.author == Author::User && m.is_pending())
        {
            message.set_correction(text);
        }
    }

    /// Returns false if the message is unknown or already corrected.
    pub fn set_correction(&mut self, id: MessageId, text: &str) -> bool {
        self.get_mut(id).map(|m| m.set_correction(text)).unwrap_or(false)
    }

    pub fn mark_failed(&mut self, id: MessageId, reason: &str) -> bool {
        self.get_mut(id)
            .map(|m| m.set_state(CorrectionState::Failed(reason.to_string())))
            .unwrap_or(false)
    }

    pub fn mark_superseded(&mut self, id: MessageId) -> bool {
        self.get_mut(id)
            .map(|m| m.set_state(CorrectionState::Superseded))
            .unwrap_or(false)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Newest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Oldest first, the order the chat view draws them in.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev()
    }

    pub fn latest(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
