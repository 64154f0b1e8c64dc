//! Chat transcript
//!
//! Append-only, ordered log of everything said in a desk session: user
//! input, backend answers and progress notes. Oldest messages are dropped
//! once the configured size is exceeded; ids keep increasing regardless.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default maximum number of messages to keep
const MAX_TRANSCRIPT_SIZE: usize = 200;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// Answers from the question endpoint
    Assistant,
    /// Progress notes, guidance and errors
    System,
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    /// Display time, `HH:MM`
    pub timestamp: String,
}

impl ChatMessage {
    fn new(id: u64, sender: Sender, text: String, at: DateTime<Local>) -> Self {
        Self {
            id,
            sender,
            text,
            timestamp: at.format("%H:%M").to_string(),
        }
    }
}

/// Ordered message log with a size limit
#[derive(Debug, Clone)]
pub struct Transcript {
    messages: VecDeque<ChatMessage>,
    next_id: u64,
    max_len: usize,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::with_max_len(MAX_TRANSCRIPT_SIZE)
    }

    /// Create with a custom size limit
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            next_id: 1,
            max_len: max_len.max(1),
        }
    }

    /// Append a message and return its id
    pub fn push(&mut self, sender: Sender, text: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.messages
            .push_back(ChatMessage::new(id, sender, text.into(), Local::now()));

        while self.messages.len() > self.max_len {
            self.messages.pop_front();
        }
        id
    }

    pub fn user(&mut self, text: impl Into<String>) -> u64 {
        self.push(Sender::User, text)
    }

    pub fn assistant(&mut self, text: impl Into<String>) -> u64 {
        self.push(Sender::Assistant, text)
    }

    pub fn system(&mut self, text: impl Into<String>) -> u64 {
        self.push(Sender::System, text)
    }

    /// All retained messages, oldest first
    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// Messages with an id greater than `id`
    pub fn since(&self, id: u64) -> Vec<ChatMessage> {
        self.messages.iter().filter(|m| m.id > id).cloned().collect()
    }

    /// The last `n` messages, oldest first
    pub fn last(&self, n: usize) -> Vec<ChatMessage> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages.iter().skip(skip).cloned().collect()
    }

    /// Id of the newest message, 0 when nothing was ever written
    pub fn last_id(&self) -> u64 {
        self.next_id - 1
    }

    /// Drop every message; ids keep counting
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
