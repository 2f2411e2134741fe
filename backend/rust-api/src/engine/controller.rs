use serde::{Deserialize, Serialize};

use super::answer::{Answer, AnswerStore, PaletteSummary, QuestionStatus};
use super::question::QuestionBank;
use super::scorer::{self, QuestionOutcome, ScoringRules};
use super::timer::{Countdown, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    Manual,
    TimedOut,
}

/// Frozen outcome of a submitted attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptResult {
    pub score: f64,
    pub correct_count: usize,
    pub wrong_count: usize,
    pub unattempted_count: usize,
    pub total_questions: usize,
    pub time_taken_seconds: u32,
    pub reason: SubmitReason,
    pub answers: Vec<Option<Answer>>,
    pub questions: QuestionBank,
    pub outcomes: Vec<QuestionOutcome>,
}

/// What the controller did with a timer tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Running { remaining: u32 },
    AutoSubmitted(Box<AttemptResult>),
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptSnapshot {
    pub phase: AttemptPhase,
    pub current_index: usize,
    pub total_questions: usize,
    pub remaining_seconds: u32,
    pub answers: Vec<Option<Answer>>,
    pub statuses: Vec<QuestionStatus>,
    pub palette: PaletteSummary,
}

/// Drives one timed attempt over a fixed question bank.
///
/// Every mutator returns `false` and leaves state untouched unless the
/// attempt is in progress and the target index is valid.
#[derive(Debug, Clone)]
pub struct AttemptController {
    bank: QuestionBank,
    rules: ScoringRules,
    store: AnswerStore,
    countdown: Countdown,
    current_index: usize,
    phase: AttemptPhase,
    result: Option<AttemptResult>,
}

impl AttemptController {
    pub fn new(bank: QuestionBank, rules: ScoringRules, duration_seconds: u32) -> Self {
        let store = AnswerStore::new(bank.len());
        Self {
            bank,
            rules,
            store,
            countdown: Countdown::new(duration_seconds),
            current_index: 0,
            phase: AttemptPhase::NotStarted,
            result: None,
        }
    }

    pub fn start(&mut self) -> bool {
        if self.phase != AttemptPhase::NotStarted {
            return false;
        }

        self.store = AnswerStore::new(self.bank.len());
        self.current_index = 0;
        self.store.mark_visited(0);
        self.countdown.start();
        self.phase = AttemptPhase::InProgress;
        true
    }

    pub fn navigate(&mut self, index: usize) -> bool {
        if !self.in_progress() || index >= self.bank.len() {
            return false;
        }

        self.store.mark_visited(self.current_index);
        self.store.mark_visited(index);
        self.current_index = index;
        true
    }

    pub fn next(&mut self) -> bool {
        self.navigate(self.current_index + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(index) => self.navigate(index),
            None => false,
        }
    }

    pub fn set_answer(&mut self, index: usize, value: Answer) -> bool {
        if !self.in_progress() {
            return false;
        }
        match self.bank.get(index) {
            Some(question) if question.kind.accepts(&value) => self.store.set_answer(index, value),
            _ => false,
        }
    }

    pub fn toggle_multi_option(&mut self, index: usize, option: usize) -> bool {
        if !self.in_progress() {
            return false;
        }
        match self.bank.get(index) {
            Some(question)
                if question.kind.is_multi() && option < question.kind.options().len() =>
            {
                self.store.toggle_multi_option(index, option)
            }
            _ => false,
        }
    }

    pub fn clear(&mut self, index: usize) -> bool {
        self.in_progress() && self.store.clear(index)
    }

    pub fn toggle_marked(&mut self, index: usize) -> bool {
        self.in_progress() && self.store.toggle_marked(index)
    }

    /// Advances the countdown by one second, submitting when it runs out.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.in_progress() {
            return TickOutcome::Idle;
        }

        match self.countdown.tick() {
            Tick::Running { remaining } => TickOutcome::Running { remaining },
            Tick::Expired => match self.submit(SubmitReason::TimedOut) {
                Some(result) => TickOutcome::AutoSubmitted(Box::new(result.clone())),
                None => TickOutcome::Idle,
            },
            Tick::Idle => TickOutcome::Idle,
        }
    }

    /// Scores the attempt and freezes the result.
    ///
    /// Returns `Some` only for the call that performed the transition.
    pub fn submit(&mut self, reason: SubmitReason) -> Option<&AttemptResult> {
        if !self.in_progress() {
            return None;
        }

        self.countdown.stop();
        self.phase = AttemptPhase::Submitted;

        let answers = self.store.answers().to_vec();
        let card = scorer::score(self.bank.as_slice(), &answers, &self.rules);

        self.result = Some(AttemptResult {
            score: card.score,
            correct_count: card.correct,
            wrong_count: card.wrong,
            unattempted_count: card.unattempted + card.ungradable,
            total_questions: self.bank.len(),
            time_taken_seconds: self.countdown.elapsed(),
            reason,
            answers,
            questions: self.bank.clone(),
            outcomes: card.outcomes,
        });
        self.result.as_ref()
    }

    pub fn snapshot(&self) -> AttemptSnapshot {
        AttemptSnapshot {
            phase: self.phase,
            current_index: self.current_index,
            total_questions: self.bank.len(),
            remaining_seconds: self.countdown.remaining(),
            answers: self.store.answers().to_vec(),
            statuses: self.store.statuses(),
            palette: self.store.palette(),
        }
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub fn in_progress(&self) -> bool {
        self.phase == AttemptPhase::InProgress
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn duration_seconds(&self) -> u32 {
        self.countdown.total()
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub fn rules(&self) -> &ScoringRules {
        &self.rules
    }

    pub fn store(&self) -> &AnswerStore {
        &self.store
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }
}
