use serde::{Deserialize, Serialize};

use super::answer::Answer;
use super::question::{Question, QuestionKind};

pub const DEFAULT_MARKS_PER_QUESTION: f64 = 2.0;

/// Exam families with a known negative-marking scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Upsc,
    Mpsc,
    Neet,
    #[default]
    Custom,
}

impl ExamType {
    /// Fraction of `marks_per_question` deducted for a wrong answer.
    pub fn default_negative_fraction(self) -> f64 {
        match self {
            ExamType::Upsc => 1.0 / 3.0,
            ExamType::Mpsc | ExamType::Neet => 0.25,
            ExamType::Custom => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub marks_per_question: f64,
    pub negative_fraction: f64,
}

impl ScoringRules {
    pub fn new(marks_per_question: f64, negative_fraction: f64) -> Self {
        Self {
            marks_per_question,
            negative_fraction,
        }
    }

    pub fn for_exam_type(exam_type: ExamType) -> Self {
        Self::new(DEFAULT_MARKS_PER_QUESTION, exam_type.default_negative_fraction())
    }

    pub fn penalty(&self) -> f64 {
        self.marks_per_question * self.negative_fraction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionOutcome {
    Correct,
    Wrong,
    Unattempted,
    /// Record has no answer key; contributes nothing.
    Ungradable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub score: f64,
    pub correct: usize,
    pub wrong: usize,
    pub unattempted: usize,
    pub ungradable: usize,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Scores `answers` against `questions` position by position.
///
/// Missing trailing answers count as unattempted.
pub fn score(questions: &[Question], answers: &[Option<Answer>], rules: &ScoringRules) -> ScoreCard {
    let mut card = ScoreCard {
        score: 0.0,
        correct: 0,
        wrong: 0,
        unattempted: 0,
        ungradable: 0,
        outcomes: Vec::with_capacity(questions.len()),
    };

    for (index, question) in questions.iter().enumerate() {
        let answer = answers.get(index).and_then(Option::as_ref);
        let outcome = grade(&question.kind, answer);

        match outcome {
            QuestionOutcome::Correct => {
                card.correct += 1;
                card.score += rules.marks_per_question;
            }
            QuestionOutcome::Wrong => {
                card.wrong += 1;
                card.score -= rules.penalty();
            }
            QuestionOutcome::Unattempted => card.unattempted += 1,
            QuestionOutcome::Ungradable => card.ungradable += 1,
        }
        card.outcomes.push(outcome);
    }

    card
}

pub fn grade(kind: &QuestionKind, answer: Option<&Answer>) -> QuestionOutcome {
    let Some(given) = answer.filter(|a| !a.is_empty()) else {
        return QuestionOutcome::Unattempted;
    };

    let correct = match kind {
        QuestionKind::Single {
            correct_answer: Some(expected),
            ..
        } => matches!(given, Answer::Choice(idx) if idx == expected),
        QuestionKind::Multi {
            correct_answer: Some(expected),
            ..
        } => matches!(given, Answer::Choices(selected) if selected == expected),
        QuestionKind::TrueFalse {
            correct_answer: Some(expected),
        } => matches!(given, Answer::Bool(value) if value == expected),
        QuestionKind::ShortAnswer {
            correct_answer: Some(expected),
        } => matches!(given, Answer::Text(text) if normalize(text) == normalize(expected)),
        _ => return QuestionOutcome::Ungradable,
    };

    if correct {
        QuestionOutcome::Correct
    } else {
        QuestionOutcome::Wrong
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
