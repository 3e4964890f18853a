//! Pluggable maximum-context policy.
//!
//! The original behavior is "send everything"; a policy can bound what goes
//! to inference without touching the durable transcript.

use super::transcript::{Role, Turn};

/// Chooses which turns are sent to inference for one generation call.
///
/// Policies see the full transcript and return the context slice; they never
/// mutate stored history.
pub trait ContextPolicy: Send + Sync {
    fn select(&self, turns: &[Turn]) -> Vec<Turn>;
    fn name(&self) -> &str;
}

/// Send the entire transcript.
#[derive(Debug, Clone, Default)]
pub struct FullContext;

impl ContextPolicy for FullContext {
    fn select(&self, turns: &[Turn]) -> Vec<Turn> {
        turns.to_vec()
    }

    fn name(&self) -> &str {
        "full"
    }
}

/// Keep the system turn plus the most recent `max_turns` turns.
#[derive(Debug, Clone)]
pub struct TailWindow {
    pub max_turns: usize,
}

impl ContextPolicy for TailWindow {
    fn select(&self, turns: &[Turn]) -> Vec<Turn> {
        let Some(first) = turns.first() else {
            return Vec::new();
        };

        let (head, rest): (&[Turn], &[Turn]) = if first.role == Role::System {
            (&turns[..1], &turns[1..])
        } else {
            (&[], turns)
        };

        let start = rest.len().saturating_sub(self.max_turns);
        let mut selected = head.to_vec();
        selected.extend_from_slice(&rest[start..]);
        selected
    }

    fn name(&self) -> &str {
        "tail_window"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pairs: usize) -> Vec<Turn> {
        let mut turns = vec![Turn::system("sys")];
        for i in 0..pairs {
            turns.push(Turn::user(format!("u{i}")));
            turns.push(Turn::assistant(format!("a{i}")));
        }
        turns
    }

    #[test]
    fn full_context_passes_everything() {
        let turns = sample(3);
        let selected = FullContext.select(&turns);
        assert_eq!(selected, turns);
    }

    #[test]
    fn tail_window_keeps_system_turn_and_tail() {
        let turns = sample(5);
        let policy = TailWindow { max_turns: 4 };

        let selected = policy.select(&turns);
        assert_eq!(selected.len(), 5);
        assert_eq!(selected[0].role, Role::System);
        assert_eq!(selected[1].content, "u3");
        assert_eq!(selected[4].content, "a4");
    }

    #[test]
    fn tail_window_shorter_than_limit_is_unchanged() {
        let turns = sample(1);
        let policy = TailWindow { max_turns: 10 };
        assert_eq!(policy.select(&turns), turns);
    }

    #[test]
    fn tail_window_on_empty_transcript() {
        let policy = TailWindow { max_turns: 4 };
        assert!(policy.select(&[]).is_empty());
    }
}
