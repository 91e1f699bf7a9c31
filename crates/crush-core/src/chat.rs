use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TRANSCRIPT_CAPACITY, GREETING};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A line in the on-screen transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Durable, wire-level form of a chat turn: `{role, content}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The trailing `window` entries of `history`, oldest first.
pub fn context_window(history: &[HistoryEntry], window: usize) -> &[HistoryEntry] {
    let start = history.len().saturating_sub(window);
    &history[start..]
}

/// Drop the oldest entries so that at most `cap` remain.
pub fn truncate_history(history: &mut Vec<HistoryEntry>, cap: usize) {
    if history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

/// Bounded, insertion-ordered message list for the current session.
///
/// Message ids come from a monotonic counter, so they keep increasing even
/// after old messages are dropped.
#[derive(Clone, Debug)]
pub struct Transcript {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
    next_id: u64,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSCRIPT_CAPACITY)
    }
}

impl Transcript {
    /// An empty transcript holding at most `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// A transcript that opens with the assistant greeting.
    pub fn with_greeting(capacity: usize) -> Self {
        let mut transcript = Self::new(capacity);
        transcript.push(Sender::Bot, GREETING);
        transcript
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_id,
            text: text.into(),
            sender,
        };
        self.next_id += 1;
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message.clone());
        message
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }
}

/// A canned conversation topic offered before the first message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SuggestedTopic {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const SUGGESTED_TOPICS: [SuggestedTopic; 4] = [
    SuggestedTopic {
        id: "1",
        title: "Profile Tips",
        description: "Get advice on improving your dating profile",
    },
    SuggestedTopic {
        id: "2",
        title: "Conversation Starters",
        description: "Ideas for breaking the ice with new matches",
    },
    SuggestedTopic {
        id: "3",
        title: "Dating Etiquette",
        description: "Tips for successful first dates",
    },
    SuggestedTopic {
        id: "4",
        title: "Relationship Advice",
        description: "Guidance for building healthy relationships",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CONTEXT_WINDOW, HISTORY_CAP};
    use proptest::prelude::*;

    fn entries(n: usize) -> Vec<HistoryEntry> {
        (0..n).map(|i| HistoryEntry::user(format!("m{i}"))).collect()
    }

    #[test]
    fn test_context_window_takes_tail() {
        let history = entries(12);
        let window = context_window(&history, CONTEXT_WINDOW);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "m2");
        assert_eq!(window[9].content, "m11");
    }

    #[test]
    fn test_context_window_short_history() {
        let history = entries(3);
        assert_eq!(context_window(&history, CONTEXT_WINDOW).len(), 3);
        assert!(context_window(&[], CONTEXT_WINDOW).is_empty());
    }

    #[test]
    fn test_truncate_keeps_newest() {
        let mut history = entries(52);
        truncate_history(&mut history, HISTORY_CAP);
        assert_eq!(history.len(), 50);
        assert_eq!(history[0].content, "m2");
        assert_eq!(history[49].content, "m51");
    }

    #[test]
    fn test_history_entry_wire_format() {
        let json = serde_json::to_value(HistoryEntry::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_transcript_greeting_and_order() {
        let mut t = Transcript::with_greeting(10);
        assert_eq!(t.len(), 1);
        assert_eq!(t.last().unwrap().sender, Sender::Bot);
        assert_eq!(t.last().unwrap().text, GREETING);

        let user = t.push(Sender::User, "hello");
        let bot = t.push(Sender::Bot, "hi there");
        assert!(bot.id > user.id);
        let senders: Vec<Sender> = t.iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::Bot, Sender::User, Sender::Bot]);
    }

    #[test]
    fn test_transcript_drops_oldest_at_capacity() {
        let mut t = Transcript::new(3);
        for i in 0..5 {
            t.push(Sender::User, format!("m{i}"));
        }
        assert_eq!(t.len(), 3);
        let texts: Vec<String> = t.iter().map(|m| m.text.clone()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
        assert_eq!(t.last().unwrap().id, 5);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut t = Transcript::new(0);
        t.push(Sender::User, "a");
        assert_eq!(t.capacity(), 1);
        assert_eq!(t.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_cap(batches in proptest::collection::vec(0usize..8, 0..40)) {
            let mut history = Vec::new();
            for n in batches {
                history.extend(entries(n));
                truncate_history(&mut history, HISTORY_CAP);
                prop_assert!(history.len() <= HISTORY_CAP);
                prop_assert!(context_window(&history, CONTEXT_WINDOW).len() <= CONTEXT_WINDOW);
            }
        }
    }
}
