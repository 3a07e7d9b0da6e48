//! Conversation memory: a buffer of past exchanges, optionally windowed.

use std::collections::VecDeque;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Exchange {
    input: String,
    output: String,
}

/// Past (input, output) exchanges.
///
/// With `window = Some(k)` only the last `k` exchanges are kept.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    window: Option<usize>,
    exchanges: VecDeque<Exchange>,
}

impl ConversationMemory {
    /// Unbounded buffer.
    pub fn buffer() -> Self {
        Self::default()
    }

    /// Keeps the last `k` exchanges.
    pub fn window(k: usize) -> Self {
        Self { window: Some(k), exchanges: VecDeque::new() }
    }

    pub fn save_context(&mut self, input: impl Into<String>, output: impl Into<String>) {
        self.exchanges.push_back(Exchange { input: input.into(), output: output.into() });
        if let Some(k) = self.window {
            while self.exchanges.len() > k {
                self.exchanges.pop_front();
            }
        }
    }

    /// `Human: ...` / `AI: ...` lines, oldest first. Empty when nothing is stored.
    pub fn history_text(&self) -> String {
        self.exchanges
            .iter()
            .map(|e| format!("Human: {}\nAI: {}", e.input, e.output))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.exchanges
            .iter()
            .flat_map(|e| {
                [
                    ChatMessage { role: Role::Human, content: e.input.clone() },
                    ChatMessage { role: Role::Ai, content: e.output.clone() },
                ]
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    /// Number of stored exchanges.
    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_keeps_everything() {
        let mut m = ConversationMemory::buffer();
        for i in 0..5 {
            m.save_context(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(m.len(), 5);
        assert_eq!(m.messages().len(), 10);
    }

    #[test]
    fn window_keeps_last_k() {
        let mut m = ConversationMemory::window(3);
        for i in 0..5 {
            m.save_context(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(m.len(), 3);
        assert!(m.history_text().starts_with("Human: q2\nAI: a2"));
        assert!(!m.history_text().contains("q1"));
    }

    #[test]
    fn clear_and_empty_history() {
        let mut m = ConversationMemory::buffer();
        assert_eq!(m.history_text(), "");
        m.save_context("hi", "hello");
        m.clear();
        assert!(m.is_empty());
    }

    #[test]
    fn messages_serialize_with_roles() {
        let mut m = ConversationMemory::buffer();
        m.save_context("hi", "hello");
        let v = serde_json::to_value(m.messages()).unwrap();
        assert_eq!(v[0]["role"], "human");
        assert_eq!(v[1]["role"], "ai");
    }
}
