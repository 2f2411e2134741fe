use serde::Deserialize;

use crate::engine::Answer;

/// Mutation requested from the answer panel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AnswerAction {
    Set { index: usize, value: Answer },
    ToggleOption { index: usize, option: usize },
    Clear { index: usize },
    ToggleMark { index: usize },
}

impl AnswerAction {
    pub fn label(&self) -> &'static str {
        match self {
            AnswerAction::Set { .. } => "set",
            AnswerAction::ToggleOption { .. } => "toggle_option",
            AnswerAction::Clear { .. } => "clear",
            AnswerAction::ToggleMark { .. } => "toggle_mark",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NavigateRequest {
    To { index: usize },
    Step { direction: Direction },
}
