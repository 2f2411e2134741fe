use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::{
    Answer, AttemptResult, AttemptSnapshot, ExamType, Question, QuestionOutcome, ScoringRules,
    SubmitReason, DEFAULT_MARKS_PER_QUESTION,
};

pub mod answer;
pub mod timer;

/// Exam document as stored by the CRUD app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub exam_type: ExamType,
    pub duration_seconds: u32,
    #[serde(default = "default_marks_per_question")]
    pub marks_per_question: f64,
    #[serde(default)]
    pub negative_fraction: Option<f64>,
    pub questions: Vec<Question>,
}

fn default_marks_per_question() -> f64 {
    DEFAULT_MARKS_PER_QUESTION
}

impl Exam {
    /// Explicit exam-level fraction wins over the exam-type table.
    pub fn scoring_rules(&self) -> ScoringRules {
        let fraction = self
            .negative_fraction
            .unwrap_or_else(|| self.exam_type.default_negative_fraction());
        ScoringRules::new(self.marks_per_question, fraction)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 128, message = "user_id must be 1-128 characters"))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128, message = "exam_id must be 1-128 characters"))]
    pub exam_id: String,
}

#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: String,
    pub exam: ExamInfo,
    pub questions: Vec<PublicQuestion>,
    pub view: AttemptView,
}

#[derive(Debug, Serialize)]
pub struct ExamInfo {
    pub id: String,
    pub title: String,
    pub exam_type: ExamType,
    pub duration_seconds: u32,
    pub marks_per_question: f64,
    pub negative_fraction: f64,
}

impl From<&Exam> for ExamInfo {
    fn from(exam: &Exam) -> Self {
        let rules = exam.scoring_rules();
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            exam_type: exam.exam_type,
            duration_seconds: exam.duration_seconds,
            marks_per_question: rules.marks_per_question,
            negative_fraction: rules.negative_fraction,
        }
    }
}

/// Question as shown to the candidate, without the answer key.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: &'static str,
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl From<&Question> for PublicQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            question_type: question.kind.type_name(),
            prompt: question.prompt.clone(),
            options: question.kind.options().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub attempt_id: String,
    pub exam_id: String,
    /// Whether the request that produced this view changed the attempt.
    pub applied: bool,
    #[serde(flatten)]
    pub snapshot: AttemptSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Completed,
    TimedOut,
}

impl From<SubmitReason> for RecordStatus {
    fn from(reason: SubmitReason) -> Self {
        match reason {
            SubmitReason::Manual => RecordStatus::Completed,
            SubmitReason::TimedOut => RecordStatus::TimedOut,
        }
    }
}

/// Persisted outcome of one attempt, in the shape the results API stores.
/// Submitted attempt in the document shape the CRUD API and its
/// leaderboard read (`examId`, `correctAnswers`, `timeTaken`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub attempt_id: String,
    pub exam_id: String,
    pub user_id: String,
    pub score: f64,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub total_questions: u32,
    pub time_taken: u32,
    pub status: RecordStatus,
    pub answers: Vec<Option<Answer>>,
    pub outcomes: Vec<QuestionOutcome>,
    pub submitted_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn from_result(
        attempt_id: &str,
        exam_id: &str,
        user_id: &str,
        result: &AttemptResult,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            attempt_id: attempt_id.to_string(),
            exam_id: exam_id.to_string(),
            user_id: user_id.to_string(),
            score: result.score,
            correct_answers: result.correct_count as u32,
            wrong_answers: result.wrong_count as u32,
            total_questions: result.total_questions as u32,
            time_taken: result.time_taken_seconds,
            status: result.reason.into(),
            answers: result.answers.clone(),
            outcomes: result.outcomes.clone(),
            submitted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewItem {
    pub question: Question,
    pub answer: Option<Answer>,
    pub outcome: QuestionOutcome,
}

/// Read-only review of a submitted attempt, with answer keys revealed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReview {
    #[serde(flatten)]
    pub record: AttemptRecord,
    pub unattempted: u32,
    pub items: Vec<ReviewItem>,
}

impl AttemptReview {
    pub fn new(record: AttemptRecord, questions: &[Question]) -> Self {
        let items: Vec<ReviewItem> = questions
            .iter()
            .enumerate()
            .map(|(index, question)| ReviewItem {
                question: question.clone(),
                answer: record.answers.get(index).cloned().flatten(),
                outcome: record
                    .outcomes
                    .get(index)
                    .copied()
                    .unwrap_or(QuestionOutcome::Unattempted),
            })
            .collect();
        let unattempted = record
            .total_questions
            .saturating_sub(record.correct_answers + record.wrong_answers);

        Self {
            record,
            unattempted,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exam_json() -> serde_json::Value {
        json!({
            "_id": "exam-1",
            "title": "UPSC Prelims Mock",
            "exam_type": "upsc",
            "duration_seconds": 600,
            "questions": [
                {"id": "q1", "type": "single", "prompt": "?", "options": ["a", "b"], "correct_answer": 0}
            ]
        })
    }

    #[test]
    fn exam_type_drives_default_fraction() {
        let exam: Exam = serde_json::from_value(exam_json()).unwrap();
        let rules = exam.scoring_rules();

        assert_eq!(rules.marks_per_question, 2.0);
        assert!((rules.negative_fraction - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn explicit_fraction_overrides_exam_type() {
        let mut raw = exam_json();
        raw["negative_fraction"] = json!(0.5);
        raw["marks_per_question"] = json!(4);
        let exam: Exam = serde_json::from_value(raw).unwrap();

        assert_eq!(exam.scoring_rules(), ScoringRules::new(4.0, 0.5));
    }

    #[test]
    fn public_question_hides_answer_key() {
        let exam: Exam = serde_json::from_value(exam_json()).unwrap();
        let public = serde_json::to_value(PublicQuestion::from(&exam.questions[0])).unwrap();

        assert_eq!(public["type"], "single");
        assert!(public.get("correct_answer").is_none());
        assert_eq!(public["options"], json!(["a", "b"]));
    }

    #[test]
    fn start_request_validation() {
        let ok = StartAttemptRequest {
            user_id: "u1".into(),
            exam_id: "e1".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = StartAttemptRequest {
            user_id: String::new(),
            exam_id: "e1".into(),
        };
        assert!(bad.validate().is_err());
    }

    fn record() -> AttemptRecord {
        AttemptRecord {
            attempt_id: "a1".into(),
            exam_id: "exam-1".into(),
            user_id: "u1".into(),
            score: 3.5,
            correct_answers: 2,
            wrong_answers: 1,
            total_questions: 4,
            time_taken: 95,
            status: RecordStatus::TimedOut,
            answers: vec![Some(Answer::Choice(0)), None],
            outcomes: vec![QuestionOutcome::Correct, QuestionOutcome::Unattempted],
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn attempt_record_uses_crud_field_names() {
        let original = record();
        let value = serde_json::to_value(&original).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();

        assert_eq!(
            keys,
            [
                "answers",
                "attemptId",
                "correctAnswers",
                "examId",
                "outcomes",
                "score",
                "status",
                "submittedAt",
                "timeTaken",
                "totalQuestions",
                "userId",
                "wrongAnswers",
            ]
        );
        assert_eq!(value["status"], "timed_out");
        assert_eq!(value["answers"], json!([0, null]));

        let parsed: AttemptRecord = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, original);
    }
}
