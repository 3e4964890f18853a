//! Conversation transcript types: roles, turns, and the ordered turn sequence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => f.write_str("system"),
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One role-tagged message. Immutable once appended to a transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

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

/// Ordered sequence of turns; insertion order is the literal inference context.
///
/// The first turn is always the single system turn, inserted at construction
/// and never reordered. Mutation is append or truncate-to-checkpoint only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// A fresh transcript holding exactly the initial system turn.
    pub fn with_system(instruction: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn::system(instruction)],
        }
    }

    /// Rebuild a transcript verbatim from persisted turns.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Drop every turn appended after `checkpoint`.
    pub fn truncate(&mut self, checkpoint: usize) {
        self.turns.truncate(checkpoint);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns visible to callers: everything after the leading system turn.
    pub fn visible(&self) -> &[Turn] {
        match self.turns.first() {
            Some(turn) if turn.role == Role::System => &self.turns[1..],
            _ => &self.turns,
        }
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_system_holds_single_system_turn() {
        let transcript = Transcript::with_system("be brief");
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.turns()[0].role, Role::System);
        assert_eq!(transcript.turns()[0].content, "be brief");
    }

    #[test]
    fn push_preserves_insertion_order() {
        let mut transcript = Transcript::with_system("sys");
        transcript.push(Turn::user("one"));
        transcript.push(Turn::assistant("two"));
        transcript.push(Turn::user("three"));

        let contents: Vec<&str> = transcript
            .turns()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(contents, ["sys", "one", "two", "three"]);
    }

    #[test]
    fn truncate_restores_checkpoint() {
        let mut transcript = Transcript::with_system("sys");
        transcript.push(Turn::user("hi"));
        transcript.push(Turn::assistant("hello"));
        let checkpoint = transcript.len();

        transcript.push(Turn::user("orphan"));
        transcript.truncate(checkpoint);

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.turns()[2].content, "hello");
    }

    #[test]
    fn visible_excludes_leading_system_turn() {
        let mut transcript = Transcript::with_system("sys");
        assert!(transcript.visible().is_empty());

        transcript.push(Turn::user("hi"));
        assert_eq!(transcript.visible().len(), 1);
        assert_eq!(transcript.visible()[0].role, Role::User);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Turn::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);

        let turn: Turn = serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(turn.role, Role::Assistant);
    }
}
