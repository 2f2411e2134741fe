use axum::http::StatusCode;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::exam_catalog::ExamCatalog;
use super::result_store::ResultStore;
use crate::engine::{
    AttemptController, AttemptResult, ExamType, QuestionBank, SubmitReason, TickOutcome,
};
use crate::metrics::{
    record_action, ATTEMPTS_ACTIVE, ATTEMPTS_STARTED_TOTAL, ATTEMPTS_SUBMITTED_TOTAL,
    ATTEMPT_SCORE, RESULTS_PERSISTED_TOTAL,
};
use crate::models::answer::{AnswerAction, Direction, NavigateRequest};
use crate::models::timer::{AttemptSubmitted, TimeExpired, TimerEvent, TimerTick};
use crate::models::{
    AttemptRecord, AttemptReview, AttemptView, ExamInfo, PublicQuestion, RecordStatus,
    StartAttemptRequest, StartAttemptResponse,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("Attempt {0} not found")]
    NotFound(String),
    #[error("Exam {0} not found")]
    ExamNotFound(String),
    #[error("Exam {0} has no questions")]
    EmptyExam(String),
    #[error("Attempt {0} has not been submitted yet")]
    NotSubmitted(String),
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl AttemptError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AttemptError::NotFound(_) | AttemptError::ExamNotFound(_) => StatusCode::NOT_FOUND,
            AttemptError::EmptyExam(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AttemptError::NotSubmitted(_) => StatusCode::CONFLICT,
            AttemptError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

struct LiveAttempt {
    attempt_id: String,
    user_id: String,
    exam_id: String,
    controller: AttemptController,
    record: Option<AttemptRecord>,
    timer: Option<JoinHandle<()>>,
}

impl LiveAttempt {
    fn view(&self, applied: bool) -> AttemptView {
        AttemptView {
            attempt_id: self.attempt_id.clone(),
            exam_id: self.exam_id.clone(),
            applied,
            snapshot: self.controller.snapshot(),
        }
    }

    /// Freezes the persisted record for a result this attempt just produced.
    fn seal(&mut self, result: &AttemptResult) -> AttemptRecord {
        let record = AttemptRecord::from_result(
            &self.attempt_id,
            &self.exam_id,
            &self.user_id,
            result,
            Utc::now(),
        );
        self.record = Some(record.clone());
        record
    }

    fn review(&self) -> Option<AttemptReview> {
        self.record
            .clone()
            .map(|record| AttemptReview::new(record, self.controller.bank().as_slice()))
    }
}

struct AttemptHandle {
    state: Mutex<LiveAttempt>,
    events: broadcast::Sender<TimerEvent>,
}

impl AttemptHandle {
    fn publish(&self, event: TimerEvent) {
        // No subscribers is the common case.
        let _ = self.events.send(event);
    }
}

/// Subscription to an attempt's timer events.
pub enum AttemptEvents {
    Live(broadcast::Receiver<TimerEvent>),
    Finished(TimerEvent),
}

/// State shared between the registry and the countdown tasks it spawns.
struct Shared {
    attempts: RwLock<HashMap<String, Arc<AttemptHandle>>>,
    results: Arc<dyn ResultStore>,
    active: AtomicUsize,
    retention: Duration,
}

/// Owns the attempts started by this process and drives their clocks.
///
/// A submitted attempt stays resident for `retention` after its record is
/// persisted; later lookups are served from the result store.
pub struct AttemptRegistry {
    shared: Arc<Shared>,
    exams: Arc<dyn ExamCatalog>,
    tick_interval: Duration,
}

impl AttemptRegistry {
    pub fn new(
        exams: Arc<dyn ExamCatalog>,
        results: Arc<dyn ResultStore>,
        tick_interval: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                attempts: RwLock::new(HashMap::new()),
                results,
                active: AtomicUsize::new(0),
                retention,
            }),
            exams,
            tick_interval,
        }
    }

    pub fn exams(&self) -> &Arc<dyn ExamCatalog> {
        &self.exams
    }

    pub fn results(&self) -> &Arc<dyn ResultStore> {
        &self.shared.results
    }

    pub async fn start_attempt(
        &self,
        req: StartAttemptRequest,
    ) -> Result<StartAttemptResponse, AttemptError> {
        let exam = self
            .exams
            .fetch_exam(&req.exam_id)
            .await?
            .ok_or_else(|| AttemptError::ExamNotFound(req.exam_id.clone()))?;

        if exam.questions.is_empty() {
            return Err(AttemptError::EmptyExam(exam.id));
        }

        let attempt_id = Uuid::new_v4().to_string();
        let exam_info = ExamInfo::from(&exam);
        let questions: Vec<PublicQuestion> = exam.questions.iter().map(PublicQuestion::from).collect();
        let rules = exam.scoring_rules();

        let mut controller =
            AttemptController::new(QuestionBank::new(exam.questions), rules, exam.duration_seconds);
        controller.start();

        let live = LiveAttempt {
            attempt_id: attempt_id.clone(),
            user_id: req.user_id.clone(),
            exam_id: exam.id.clone(),
            controller,
            record: None,
            timer: None,
        };
        let view = live.view(true);

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let handle = Arc::new(AttemptHandle {
            state: Mutex::new(live),
            events,
        });

        // Registered before the clock starts so expiry always finds it.
        self.shared
            .attempts
            .write()
            .await
            .insert(attempt_id.clone(), handle.clone());
        self.shared.active.fetch_add(1, Ordering::Relaxed);

        {
            let mut live = handle.state.lock().await;
            live.timer = Some(tokio::spawn(run_countdown(
                handle.clone(),
                self.shared.clone(),
                self.tick_interval,
            )));
        }

        ATTEMPTS_STARTED_TOTAL
            .with_label_values(&[exam_type_label(exam.exam_type)])
            .inc();
        ATTEMPTS_ACTIVE.inc();

        tracing::info!(
            "Attempt started: attempt={}, exam={}, user={}, questions={}, duration={}s",
            attempt_id,
            exam.id,
            req.user_id,
            questions.len(),
            exam.duration_seconds
        );

        Ok(StartAttemptResponse {
            attempt_id,
            exam: exam_info,
            questions,
            view,
        })
    }

    async fn handle(&self, attempt_id: &str) -> Result<Arc<AttemptHandle>, AttemptError> {
        self.shared
            .attempts
            .read()
            .await
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))
    }

    async fn stored_record(&self, attempt_id: &str) -> Result<AttemptRecord, AttemptError> {
        self.shared
            .results
            .find(attempt_id)
            .await?
            .ok_or_else(|| AttemptError::NotFound(attempt_id.to_string()))
    }

    /// Rebuilds the review of an attempt that is no longer resident.
    async fn stored_review(&self, attempt_id: &str) -> Result<AttemptReview, AttemptError> {
        let record = self.stored_record(attempt_id).await?;
        let exam = self
            .exams
            .fetch_exam(&record.exam_id)
            .await?
            .ok_or_else(|| AttemptError::ExamNotFound(record.exam_id.clone()))?;

        Ok(AttemptReview::new(record, &exam.questions))
    }

    pub async fn view(&self, attempt_id: &str) -> Result<AttemptView, AttemptError> {
        let handle = self.handle(attempt_id).await?;
        let live = handle.state.lock().await;
        Ok(live.view(false))
    }

    pub async fn navigate(
        &self,
        attempt_id: &str,
        req: NavigateRequest,
    ) -> Result<AttemptView, AttemptError> {
        let handle = self.handle(attempt_id).await?;
        let mut live = handle.state.lock().await;

        let applied = match req {
            NavigateRequest::To { index } => live.controller.navigate(index),
            NavigateRequest::Step {
                direction: Direction::Next,
            } => live.controller.next(),
            NavigateRequest::Step {
                direction: Direction::Previous,
            } => live.controller.previous(),
        };
        record_action("navigate", applied);

        if !applied {
            tracing::debug!("Navigation ignored: attempt={}, request={:?}", attempt_id, req);
        }
        Ok(live.view(applied))
    }

    pub async fn apply(
        &self,
        attempt_id: &str,
        action: AnswerAction,
    ) -> Result<AttemptView, AttemptError> {
        let handle = self.handle(attempt_id).await?;
        let mut live = handle.state.lock().await;
        let label = action.label();

        let applied = match action {
            AnswerAction::Set { index, value } => live.controller.set_answer(index, value),
            AnswerAction::ToggleOption { index, option } => {
                live.controller.toggle_multi_option(index, option)
            }
            AnswerAction::Clear { index } => live.controller.clear(index),
            AnswerAction::ToggleMark { index } => live.controller.toggle_marked(index),
        };
        record_action(label, applied);

        if !applied {
            tracing::debug!(
                "Answer action ignored: attempt={}, action={}, phase={:?}",
                attempt_id,
                label,
                live.controller.phase()
            );
        }
        Ok(live.view(applied))
    }

    /// Submits the attempt. Repeated calls return the frozen review and
    /// `false`; only the first call scores and persists.
    pub async fn submit(&self, attempt_id: &str) -> Result<(AttemptReview, bool), AttemptError> {
        let handle = match self.handle(attempt_id).await {
            Ok(handle) => handle,
            Err(AttemptError::NotFound(_)) => {
                let review = self.stored_review(attempt_id).await?;
                record_action("submit", false);
                return Ok((review, false));
            }
            Err(e) => return Err(e),
        };
        let mut live = handle.state.lock().await;

        let submitted = live.controller.submit(SubmitReason::Manual).cloned();
        let Some(result) = submitted else {
            record_action("submit", false);
            return live
                .review()
                .map(|review| (review, false))
                .ok_or_else(|| AttemptError::NotSubmitted(attempt_id.to_string()));
        };
        record_action("submit", true);

        if let Some(timer) = live.timer.take() {
            timer.abort();
        }
        let record = live.seal(&result);
        let review = AttemptReview::new(record.clone(), live.controller.bank().as_slice());
        drop(live);

        self.shared.finish(&handle, &result, record).await;
        Ok((review, true))
    }

    pub async fn review(&self, attempt_id: &str) -> Result<AttemptReview, AttemptError> {
        let Ok(handle) = self.handle(attempt_id).await else {
            return self.stored_review(attempt_id).await;
        };
        let live = handle.state.lock().await;
        live.review()
            .ok_or_else(|| AttemptError::NotSubmitted(attempt_id.to_string()))
    }

    pub async fn subscribe(&self, attempt_id: &str) -> Result<AttemptEvents, AttemptError> {
        let Ok(handle) = self.handle(attempt_id).await else {
            let record = self.stored_record(attempt_id).await?;
            return Ok(AttemptEvents::Finished(stored_event(&record)));
        };
        let live = handle.state.lock().await;

        let events = match live.controller.result() {
            Some(result) if live.record.is_some() => {
                AttemptEvents::Finished(submitted_event(&live.attempt_id, result))
            }
            _ => AttemptEvents::Live(handle.events.subscribe()),
        };
        Ok(events)
    }

    /// Attempts started and not yet submitted.
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    /// Attempts currently held in memory, including recently submitted ones.
    pub async fn resident_count(&self) -> usize {
        self.shared.attempts.read().await.len()
    }
}

/// Ticks the attempt once per interval until it is submitted.
async fn run_countdown(handle: Arc<AttemptHandle>, shared: Arc<Shared>, tick_interval: Duration) {
    let mut interval = tokio::time::interval(tick_interval);
    // First tick of a tokio interval completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        let mut live = handle.state.lock().await;
        match live.controller.tick() {
            TickOutcome::Running { remaining } => {
                let total = live.controller.duration_seconds();
                handle.publish(TimerEvent::TimerTick(TimerTick {
                    attempt_id: live.attempt_id.clone(),
                    remaining_seconds: remaining,
                    elapsed_seconds: total - remaining,
                    total_seconds: total,
                    timestamp: Utc::now(),
                }));
            }
            TickOutcome::AutoSubmitted(result) => {
                live.timer = None;
                let record = live.seal(&result);
                tracing::info!("Attempt timed out: attempt={}", live.attempt_id);
                handle.publish(TimerEvent::TimeExpired(TimeExpired {
                    attempt_id: live.attempt_id.clone(),
                    timestamp: Utc::now(),
                    message: "Time limit reached, attempt submitted".to_string(),
                }));
                drop(live);

                shared.finish(&handle, &result, record).await;
                return;
            }
            TickOutcome::Idle => return,
        }
    }
}

impl Shared {
    /// Runs once per attempt, right after the submit transition.
    async fn finish(
        self: &Arc<Self>,
        handle: &AttemptHandle,
        result: &AttemptResult,
        record: AttemptRecord,
    ) {
        let reason = match result.reason {
            SubmitReason::Manual => "manual",
            SubmitReason::TimedOut => "timed_out",
        };
        ATTEMPTS_SUBMITTED_TOTAL.with_label_values(&[reason]).inc();
        ATTEMPTS_ACTIVE.dec();
        ATTEMPT_SCORE.observe(result.score);
        self.active.fetch_sub(1, Ordering::Relaxed);

        tracing::info!(
            "Attempt submitted: attempt={}, reason={}, score={:.3}, correct={}, wrong={}",
            record.attempt_id,
            reason,
            result.score,
            result.correct_count,
            result.wrong_count
        );

        handle.publish(submitted_event(&record.attempt_id, result));

        match self.results.save(&record).await {
            Ok(()) => {
                RESULTS_PERSISTED_TOTAL.with_label_values(&["success"]).inc();
                self.evict(record.attempt_id).await;
            }
            Err(e) => {
                // Kept resident: memory is the only copy of this result.
                RESULTS_PERSISTED_TOTAL.with_label_values(&["error"]).inc();
                tracing::error!(
                    "Failed to persist attempt result {}: {:#}",
                    record.attempt_id,
                    e
                );
            }
        }
    }

    /// Drops a persisted attempt from memory once its retention has passed.
    async fn evict(self: &Arc<Self>, attempt_id: String) {
        if self.retention.is_zero() {
            self.attempts.write().await.remove(&attempt_id);
            tracing::debug!("Attempt evicted: attempt={}", attempt_id);
            return;
        }

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(shared.retention).await;
            shared.attempts.write().await.remove(&attempt_id);
            tracing::debug!("Attempt evicted: attempt={}", attempt_id);
        });
    }
}

fn submitted_event(attempt_id: &str, result: &AttemptResult) -> TimerEvent {
    TimerEvent::AttemptSubmitted(AttemptSubmitted {
        attempt_id: attempt_id.to_string(),
        reason: result.reason,
        score: result.score,
        timestamp: Utc::now(),
    })
}

fn stored_event(record: &AttemptRecord) -> TimerEvent {
    let reason = match record.status {
        RecordStatus::Completed => SubmitReason::Manual,
        RecordStatus::TimedOut => SubmitReason::TimedOut,
    };
    TimerEvent::AttemptSubmitted(AttemptSubmitted {
        attempt_id: record.attempt_id.clone(),
        reason,
        score: record.score,
        timestamp: record.submitted_at,
    })
}

fn exam_type_label(exam_type: ExamType) -> &'static str {
    match exam_type {
        ExamType::Upsc => "upsc",
        ExamType::Mpsc => "mpsc",
        ExamType::Neet => "neet",
        ExamType::Custom => "custom",
    }
}
