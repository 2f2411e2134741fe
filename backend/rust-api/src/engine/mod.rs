//! Exam attempt engine: question bank, answer store, countdown, scorer and
//! the controller tying them together. No I/O happens here; the service
//! layer owns fetching exams, driving the clock and persisting results.

pub mod answer;
pub mod controller;
pub mod question;
pub mod scorer;
pub mod timer;

pub use answer::{Answer, AnswerStore, PaletteSummary, QuestionStatus};
pub use controller::{
    AttemptController, AttemptPhase, AttemptResult, AttemptSnapshot, SubmitReason, TickOutcome,
};
pub use question::{Question, QuestionBank, QuestionKind};
pub use scorer::{ExamType, QuestionOutcome, ScoreCard, ScoringRules, DEFAULT_MARKS_PER_QUESTION};
pub use timer::{Countdown, Tick};
