use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A candidate's answer to one question.
///
/// Serialized untagged so the wire form is `int | int[] | bool | string`,
/// with `null` (i.e. `None` in the store) meaning unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Bool(bool),
    Choice(usize),
    Choices(BTreeSet<usize>),
    Text(String),
}

impl Answer {
    pub fn is_empty(&self) -> bool {
        match self {
            Answer::Choices(selected) => selected.is_empty(),
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Bool(_) | Answer::Choice(_) => false,
        }
    }
}

pub fn is_unanswered(answer: Option<&Answer>) -> bool {
    answer.map_or(true, Answer::is_empty)
}

/// Navigator-panel status of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    NotVisited,
    Marked,
    AnsweredAndMarked,
    NotAnswered,
    Answered,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteSummary {
    pub not_visited: usize,
    pub marked: usize,
    pub answered_and_marked: usize,
    pub not_answered: usize,
    pub answered: usize,
}

/// Per-question answers plus visited/marked flags.
///
/// Indices outside the store are ignored by every mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerStore {
    answers: Vec<Option<Answer>>,
    visited: BTreeSet<usize>,
    marked: BTreeSet<usize>,
}

impl AnswerStore {
    pub fn new(len: usize) -> Self {
        Self {
            answers: vec![None; len],
            visited: BTreeSet::new(),
            marked: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn answer(&self, index: usize) -> Option<&Answer> {
        self.answers.get(index).and_then(Option::as_ref)
    }

    pub fn answers(&self) -> &[Option<Answer>] {
        &self.answers
    }

    pub fn visited(&self) -> &BTreeSet<usize> {
        &self.visited
    }

    pub fn marked(&self) -> &BTreeSet<usize> {
        &self.marked
    }

    pub fn set_answer(&mut self, index: usize, value: Answer) -> bool {
        match self.answers.get_mut(index) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn toggle_multi_option(&mut self, index: usize, option: usize) -> bool {
        let Some(slot) = self.answers.get_mut(index) else {
            return false;
        };

        match slot {
            Some(Answer::Choices(selected)) => {
                if !selected.remove(&option) {
                    selected.insert(option);
                }
            }
            None => *slot = Some(Answer::Choices(BTreeSet::from([option]))),
            Some(_) => return false,
        }
        true
    }

    pub fn clear(&mut self, index: usize) -> bool {
        match self.answers.get_mut(index) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    pub fn mark_visited(&mut self, index: usize) -> bool {
        if index >= self.answers.len() {
            return false;
        }
        self.visited.insert(index);
        true
    }

    pub fn toggle_marked(&mut self, index: usize) -> bool {
        if index >= self.answers.len() {
            return false;
        }
        if !self.marked.remove(&index) {
            self.marked.insert(index);
        }
        true
    }

    /// First matching rule wins: not visited, marked, answered and marked,
    /// not answered, answered.
    pub fn status(&self, index: usize) -> QuestionStatus {
        let empty = is_unanswered(self.answer(index));
        let marked = self.marked.contains(&index);

        if !self.visited.contains(&index) {
            QuestionStatus::NotVisited
        } else if marked && empty {
            QuestionStatus::Marked
        } else if marked {
            QuestionStatus::AnsweredAndMarked
        } else if empty {
            QuestionStatus::NotAnswered
        } else {
            QuestionStatus::Answered
        }
    }

    pub fn statuses(&self) -> Vec<QuestionStatus> {
        (0..self.answers.len()).map(|i| self.status(i)).collect()
    }

    pub fn palette(&self) -> PaletteSummary {
        self.statuses()
            .into_iter()
            .fold(PaletteSummary::default(), |mut acc, status| {
                match status {
                    QuestionStatus::NotVisited => acc.not_visited += 1,
                    QuestionStatus::Marked => acc.marked += 1,
                    QuestionStatus::AnsweredAndMarked => acc.answered_and_marked += 1,
                    QuestionStatus::NotAnswered => acc.not_answered += 1,
                    QuestionStatus::Answered => acc.answered += 1,
                }
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_json_shapes() {
        let parsed: Vec<Option<Answer>> =
            serde_json::from_str(r#"[1, [2, 0], true, "ganga", null]"#).unwrap();

        assert_eq!(
            parsed,
            vec![
                Some(Answer::Choice(1)),
                Some(Answer::Choices(BTreeSet::from([0, 2]))),
                Some(Answer::Bool(true)),
                Some(Answer::Text("ganga".into())),
                None,
            ]
        );
    }

    #[test]
    fn emptiness_rules() {
        assert!(is_unanswered(None));
        assert!(is_unanswered(Some(&Answer::Choices(BTreeSet::new()))));
        assert!(is_unanswered(Some(&Answer::Text("   ".into()))));
        assert!(!is_unanswered(Some(&Answer::Bool(false))));
        assert!(!is_unanswered(Some(&Answer::Choice(0))));
    }

    #[test]
    fn toggle_multi_option_adds_then_removes() {
        let mut store = AnswerStore::new(1);

        assert!(store.toggle_multi_option(0, 2));
        assert!(store.toggle_multi_option(0, 0));
        assert_eq!(
            store.answer(0),
            Some(&Answer::Choices(BTreeSet::from([0, 2])))
        );

        assert!(store.toggle_multi_option(0, 2));
        assert_eq!(store.answer(0), Some(&Answer::Choices(BTreeSet::from([0]))));
    }

    #[test]
    fn toggle_multi_option_rejects_non_set_answer() {
        let mut store = AnswerStore::new(1);
        store.set_answer(0, Answer::Choice(1));

        assert!(!store.toggle_multi_option(0, 0));
        assert_eq!(store.answer(0), Some(&Answer::Choice(1)));
    }

    #[test]
    fn out_of_range_mutations_are_ignored() {
        let mut store = AnswerStore::new(2);

        assert!(!store.set_answer(2, Answer::Bool(true)));
        assert!(!store.clear(5));
        assert!(!store.mark_visited(2));
        assert!(!store.toggle_marked(9));
        assert_eq!(store, AnswerStore::new(2));
    }

    #[test]
    fn status_precedence() {
        let mut store = AnswerStore::new(5);

        // 0: never visited, even if marked
        store.toggle_marked(0);

        // 1: marked, empty
        store.mark_visited(1);
        store.toggle_marked(1);

        // 2: marked, answered
        store.mark_visited(2);
        store.toggle_marked(2);
        store.set_answer(2, Answer::Bool(true));

        // 3: visited, empty multi selection
        store.mark_visited(3);
        store.set_answer(3, Answer::Choices(BTreeSet::new()));

        // 4: visited, answered
        store.mark_visited(4);
        store.set_answer(4, Answer::Text("x".into()));

        assert_eq!(
            store.statuses(),
            vec![
                QuestionStatus::NotVisited,
                QuestionStatus::Marked,
                QuestionStatus::AnsweredAndMarked,
                QuestionStatus::NotAnswered,
                QuestionStatus::Answered,
            ]
        );
        assert_eq!(
            store.palette(),
            PaletteSummary {
                not_visited: 1,
                marked: 1,
                answered_and_marked: 1,
                not_answered: 1,
                answered: 1,
            }
        );
    }

    #[test]
    fn toggle_marked_flips_and_visited_is_idempotent() {
        let mut store = AnswerStore::new(1);
        store.mark_visited(0);
        store.mark_visited(0);
        assert_eq!(store.visited().len(), 1);

        store.toggle_marked(0);
        assert!(store.marked().contains(&0));
        store.toggle_marked(0);
        assert!(store.marked().is_empty());
    }
}
