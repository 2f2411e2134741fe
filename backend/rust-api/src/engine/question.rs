use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::answer::Answer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Question variants with their answer key.
///
/// `correct_answer` is optional on every variant: exams are authored in the
/// CRUD app and a record without a key must not abort scoring of the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Single {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        correct_answer: Option<usize>,
    },
    Multi {
        #[serde(default)]
        options: Vec<String>,
        #[serde(default)]
        correct_answer: Option<BTreeSet<usize>>,
    },
    TrueFalse {
        #[serde(default)]
        correct_answer: Option<bool>,
    },
    ShortAnswer {
        #[serde(default)]
        correct_answer: Option<String>,
    },
}

impl QuestionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::Single { .. } => "single",
            QuestionKind::Multi { .. } => "multi",
            QuestionKind::TrueFalse { .. } => "true_false",
            QuestionKind::ShortAnswer { .. } => "short_answer",
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            QuestionKind::Single { options, .. } | QuestionKind::Multi { options, .. } => options,
            QuestionKind::TrueFalse { .. } | QuestionKind::ShortAnswer { .. } => &[],
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, QuestionKind::Multi { .. })
    }

    /// True when the record carries an answer key for its declared type.
    pub fn is_gradable(&self) -> bool {
        match self {
            QuestionKind::Single { correct_answer, .. } => correct_answer.is_some(),
            QuestionKind::Multi { correct_answer, .. } => correct_answer.is_some(),
            QuestionKind::TrueFalse { correct_answer } => correct_answer.is_some(),
            QuestionKind::ShortAnswer { correct_answer } => correct_answer.is_some(),
        }
    }

    /// Whether `answer` has the shape this question expects.
    pub fn accepts(&self, answer: &Answer) -> bool {
        match (self, answer) {
            (QuestionKind::Single { options, .. }, Answer::Choice(idx)) => *idx < options.len(),
            (QuestionKind::Multi { options, .. }, Answer::Choices(selected)) => {
                selected.iter().all(|idx| *idx < options.len())
            }
            (QuestionKind::TrueFalse { .. }, Answer::Bool(_)) => true,
            (QuestionKind::ShortAnswer { .. }, Answer::Text(_)) => true,
            _ => false,
        }
    }
}

/// Read-only ordered question sequence for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBank {
    questions: Arc<[Question]>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: questions.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn as_slice(&self) -> &[Question] {
        &self.questions
    }
}

impl From<Vec<Question>> for QuestionBank {
    fn from(questions: Vec<Question>) -> Self {
        Self::new(questions)
    }
}

impl Serialize for QuestionBank {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.questions.as_ref().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_each_question_type() {
        let raw = json!([
            {"id": "q1", "type": "single", "prompt": "Capital?", "options": ["A", "B"], "correct_answer": 1},
            {"id": "q2", "type": "multi", "prompt": "Rivers?", "options": ["Ganga", "Alps", "Yamuna"], "correct_answer": [2, 0]},
            {"id": "q3", "type": "true_false", "prompt": "Earth is round", "correct_answer": true},
            {"id": "q4", "type": "short_answer", "prompt": "Longest river?", "correct_answer": "Ganga"}
        ]);

        let questions: Vec<Question> = serde_json::from_value(raw).unwrap();

        assert_eq!(questions[0].kind.type_name(), "single");
        assert_eq!(
            questions[1].kind,
            QuestionKind::Multi {
                options: vec!["Ganga".into(), "Alps".into(), "Yamuna".into()],
                correct_answer: Some(BTreeSet::from([0, 2])),
            }
        );
        assert_eq!(
            questions[2].kind,
            QuestionKind::TrueFalse {
                correct_answer: Some(true)
            }
        );
        assert!(questions[3].kind.options().is_empty());
    }

    #[test]
    fn missing_answer_key_is_not_gradable() {
        let question: Question = serde_json::from_value(json!({
            "id": "q1", "type": "single", "prompt": "?", "options": ["a", "b"]
        }))
        .unwrap();

        assert!(!question.kind.is_gradable());
    }

    #[test]
    fn accepts_checks_shape_and_option_range() {
        let single = QuestionKind::Single {
            options: vec!["a".into(), "b".into()],
            correct_answer: Some(0),
        };
        assert!(single.accepts(&Answer::Choice(1)));
        assert!(!single.accepts(&Answer::Choice(2)));
        assert!(!single.accepts(&Answer::Bool(true)));

        let multi = QuestionKind::Multi {
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer: Some(BTreeSet::from([0, 2])),
        };
        assert!(multi.accepts(&Answer::Choices(BTreeSet::from([0, 2]))));
        assert!(!multi.accepts(&Answer::Choices(BTreeSet::from([3]))));
        assert!(!multi.accepts(&Answer::Choice(0)));

        let short = QuestionKind::ShortAnswer {
            correct_answer: Some("x".into()),
        };
        assert!(short.accepts(&Answer::Text("y".into())));
    }

    #[test]
    fn bank_lookup_is_bounded() {
        let bank = QuestionBank::new(vec![Question {
            id: "q1".into(),
            prompt: "?".into(),
            kind: QuestionKind::TrueFalse {
                correct_answer: Some(false),
            },
        }]);

        assert_eq!(bank.len(), 1);
        assert!(bank.get(0).is_some());
        assert!(bank.get(1).is_none());
    }
}
