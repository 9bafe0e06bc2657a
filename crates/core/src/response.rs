//! The result of one engine run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::agent::Agent;
use crate::message::{ChatMessage, Role};

/// Text returned to channels when a run stops on the turn budget.
pub const TRUNCATION_NOTICE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model produced a final answer.
    Completed,
    /// The turn budget ran out before a final answer.
    Truncated,
}

/// The transcript and bookkeeping of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Full transcript, including the system instructions and new turns
    pub messages: Vec<ChatMessage>,

    /// The agent snapshot the run used
    pub agent: Agent,

    /// Context variables after the last turn
    pub final_variables: HashMap<String, String>,

    pub outcome: RunOutcome,

    /// Completed tool-dispatch rounds
    pub turns: u32,

    /// Model calls issued
    pub provider_calls: u32,
}

impl AgentResponse {
    pub fn is_truncated(&self) -> bool {
        self.outcome == RunOutcome::Truncated
    }

    /// The answer to hand to a channel.
    pub fn final_text(&self) -> &str {
        match self.outcome {
            RunOutcome::Truncated => TRUNCATION_NOTICE,
            RunOutcome::Completed => self
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(|m| m.content.as_str())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(outcome: RunOutcome) -> AgentResponse {
        AgentResponse {
            messages: vec![
                ChatMessage::system("be nice"),
                ChatMessage::user("2+2?"),
                ChatMessage::assistant("4"),
            ],
            agent: Agent::default(),
            final_variables: HashMap::new(),
            outcome,
            turns: 0,
            provider_calls: 1,
        }
    }

    #[test]
    fn completed_text_is_last_assistant_message() {
        let r = response(RunOutcome::Completed);
        assert!(!r.is_truncated());
        assert_eq!(r.final_text(), "4");
    }

    #[test]
    fn truncated_text_is_the_notice() {
        let r = response(RunOutcome::Truncated);
        assert!(r.is_truncated());
        assert_eq!(r.final_text(), TRUNCATION_NOTICE);
    }

    #[test]
    fn outcome_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&RunOutcome::Truncated).unwrap(),
            r#""truncated""#
        );
    }
}
