//! Intake engine — the wizard controller.
//!
//! Owns the session and every component, applies patient actions, and
//! folds backend completions back in one at a time. Backend calls run on
//! spawned tasks and report through an internal channel, so engine state is
//! only ever touched from the task driving the engine.
//!
//! All mutating methods spawn Tokio tasks and must run inside a runtime.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{AnalysisPayload, FollowUpQuestion, FollowUpReply, IntakeBackend};
use crate::config::IntakeConfig;
use crate::error::{BackendError, ValidationError};
use crate::followup::{AnswerOutcome, FollowUpConductor, RoundOutcome};
use crate::results::{self, AnalysisPanel};
use crate::search::{SearchEvent, SymptomSearch};
use crate::session::{
    FollowUpAnswer, Gender, HistoryAnswer, HistoryKey, HistoryQuestion, SessionState,
    load_history_questions,
};
use crate::view::{HistoryQuestionView, Navigation, Presenter, ViewModel};
use crate::wizard::{self, Step, Wizard};

/// A patient action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectGender(Gender),
    EnterAge(i32),
    AnswerHistory(HistoryKey, HistoryAnswer),
    TypeQuery(String),
    PickSuggestion(String),
    RemoveSymptom(String),
    DismissSuggestions,
    AnswerFollowUp(FollowUpAnswer),
    Next,
    Back,
    JumpTo(Step),
}

/// Completion of deferred work.
#[derive(Debug)]
pub enum EngineEvent {
    Search(SearchEvent),
    FollowUpReplied {
        round: u64,
        result: Result<FollowUpReply, BackendError>,
    },
    AnalysisReady {
        request: u64,
        result: Result<AnalysisPayload, BackendError>,
    },
}

impl From<SearchEvent> for EngineEvent {
    fn from(event: SearchEvent) -> Self {
        Self::Search(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Via {
    Advance,
    Retreat,
    Jump,
}

pub struct IntakeEngine {
    id: Uuid,
    config: IntakeConfig,
    backend: Arc<dyn IntakeBackend>,
    session: SessionState,
    wizard: Wizard,
    notice: Option<String>,
    history: Vec<HistoryQuestion>,
    search: SymptomSearch,
    followup: FollowUpConductor,
    analysis: AnalysisPanel,
    analysis_request: u64,
    analysis_pending: Option<u64>,
    events_tx: UnboundedSender<EngineEvent>,
    events_rx: UnboundedReceiver<EngineEvent>,
    presenter: Option<Box<dyn Presenter>>,
}

impl IntakeEngine {
    pub fn new(config: IntakeConfig, backend: Arc<dyn IntakeBackend>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        info!(session = %id, backend = config.backend_url.as_str(), "Intake session started");
        Self {
            id,
            search: SymptomSearch::new(config.debounce, config.min_query_len),
            followup: FollowUpConductor::new(config.max_followup_rounds),
            config,
            backend,
            session: SessionState::new(),
            wizard: Wizard::new(),
            notice: None,
            history: Vec::new(),
            analysis: AnalysisPanel::Idle,
            analysis_request: 0,
            analysis_pending: None,
            events_tx,
            events_rx,
            presenter: None,
        }
    }

    pub fn with_presenter(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenter = Some(Box::new(presenter));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn current_step(&self) -> Step {
        self.wizard.current()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn suggestions(&self) -> &[String] {
        self.search.suggestions()
    }

    pub fn current_question(&self) -> Option<&FollowUpQuestion> {
        self.followup.current_question()
    }

    pub fn analysis(&self) -> &AnalysisPanel {
        &self.analysis
    }

    /// No timers pending and no backend call outstanding.
    pub fn is_idle(&self) -> bool {
        self.search.is_idle() && !self.followup.is_waiting() && self.analysis_pending.is_none()
    }

    pub fn view(&self) -> ViewModel {
        let step = self.wizard.current();
        ViewModel {
            active_step: step,
            steps: ViewModel::step_indicators(step),
            navigation: Navigation::for_step(step),
            notice: self.notice.clone(),
            demographics: self.session.demographics.clone(),
            history: self
                .history
                .iter()
                .map(|q| HistoryQuestionView {
                    key: q.key,
                    text: q.text,
                    options: q.options,
                    selected: self.session.history.get(&q.key).copied(),
                })
                .collect(),
            query: self.search.input().to_string(),
            suggestions: self.search.panel().clone(),
            selected_symptoms: self.session.symptoms.clone(),
            follow_up: self.followup.panel(),
            analysis: self.analysis.clone(),
        }
    }

    /// Apply one patient action. Only `Next` can be refused.
    pub fn dispatch(&mut self, action: Action) -> Result<(), ValidationError> {
        match action {
            Action::SelectGender(gender) => self.select_gender(gender),
            Action::EnterAge(age) => self.enter_age(age),
            Action::AnswerHistory(key, answer) => self.answer_history(key, answer),
            Action::TypeQuery(text) => self.type_query(&text),
            Action::PickSuggestion(name) => self.add_symptom(&name),
            Action::RemoveSymptom(name) => self.remove_symptom(&name),
            Action::DismissSuggestions => self.dismiss_suggestions(),
            Action::AnswerFollowUp(answer) => self.answer_follow_up(answer),
            Action::Next => return self.advance().map(|_| ()),
            Action::Back => {
                self.retreat();
            }
            Action::JumpTo(step) => {
                self.jump_to(step);
            }
        }
        Ok(())
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Validate the current step and move forward one.
    pub fn advance(&mut self) -> Result<Step, ValidationError> {
        let from = self.wizard.current();
        if let Err(e) = wizard::validate(from, &self.session) {
            info!(session = %self.id, step = %from, reason = %e, "Advance blocked");
            self.notice = Some(e.message.clone());
            self.render();
            return Err(e);
        }
        if let Some(to) = self.wizard.advance() {
            self.enter(from, to, Via::Advance);
        }
        self.render();
        Ok(self.wizard.current())
    }

    /// Move back one step. No validation going backward.
    pub fn retreat(&mut self) -> Option<Step> {
        let from = self.wizard.current();
        let to = self.wizard.retreat()?;
        self.enter(from, to, Via::Retreat);
        self.render();
        Some(to)
    }

    /// Jump to any completed step or at most one ahead. Ignored otherwise.
    pub fn jump_to(&mut self, target: Step) -> bool {
        let from = self.wizard.current();
        if !self.wizard.jump_to(target) {
            debug!(session = %self.id, from = %from, to = %target, "Jump ignored");
            return false;
        }
        self.enter(from, target, Via::Jump);
        self.render();
        true
    }

    fn enter(&mut self, from: Step, to: Step, via: Via) {
        self.notice = None;
        if from == Step::FollowUp && to != Step::FollowUp {
            self.followup.cancel();
        }
        info!(session = %self.id, from = %from, to = %to, via = ?via, "Step transition");

        match (to, via) {
            (Step::History, _) => self.history = load_history_questions(),
            (Step::FollowUp, Via::Advance) if self.session.has_symptoms() => self.start_followup(),
            (Step::Results, Via::Advance) => self.request_analysis(),
            _ => {}
        }
    }

    // ── Data entry ──────────────────────────────────────────────────

    pub fn select_gender(&mut self, gender: Gender) {
        self.session.set_gender(gender);
        if self.config.auto_advance_on_gender && self.wizard.is_active(Step::Sex) {
            let _ = self.advance();
        } else {
            self.render();
        }
    }

    pub fn enter_age(&mut self, age: i32) {
        if !self.session.set_age(age) {
            info!(session = %self.id, age, "Age out of range; cleared");
            if let Err(e) = wizard::validate(Step::Age, &self.session) {
                self.notice = Some(e.message);
            }
        }
        self.render();
    }

    pub fn answer_history(&mut self, key: HistoryKey, answer: HistoryAnswer) {
        self.session.answer_history(key, answer);
        self.render();
    }

    pub fn type_query(&mut self, text: &str) {
        self.search.on_input(text, &self.session, &self.events_tx);
        self.render();
    }

    pub fn add_symptom(&mut self, name: &str) {
        if self.search.add_symptom(name, &mut self.session) {
            debug!(session = %self.id, symptom = name, "Symptom added");
        }
        self.render();
    }

    pub fn remove_symptom(&mut self, name: &str) {
        if self.search.remove_symptom(name, &mut self.session) {
            debug!(session = %self.id, symptom = name, "Symptom removed");
        }
        self.render();
    }

    pub fn dismiss_suggestions(&mut self) {
        self.search.dismiss();
        self.render();
    }

    pub fn answer_follow_up(&mut self, answer: FollowUpAnswer) {
        match self.followup.answer(answer, &mut self.session) {
            AnswerOutcome::NextRound(round) => self.submit_round(round),
            AnswerOutcome::LimitReached => self.finish_followup(),
            AnswerOutcome::Ignored => {}
        }
        self.render();
    }

    // ── Backend work ────────────────────────────────────────────────

    fn spawn_suggest(&self, query: String) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.suggest(&query).await;
            let _ = tx.send(SearchEvent::SuggestionsLoaded { query, result }.into());
        });
    }

    fn start_followup(&mut self) {
        let round = self.followup.start();
        self.submit_round(round);
    }

    fn submit_round(&self, round: u64) {
        info!(session = %self.id, round, answered = self.session.detailed_symptoms.len(), "Submitting follow-up round");
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let snapshot = self.session.clone();
        tokio::spawn(async move {
            let result = backend.advance_intake(&snapshot).await;
            let _ = tx.send(EngineEvent::FollowUpReplied { round, result });
        });
    }

    fn finish_followup(&mut self) {
        if self.wizard.is_active(Step::FollowUp) {
            let _ = self.advance();
        }
    }

    fn request_analysis(&mut self) {
        self.analysis_request += 1;
        let request = self.analysis_request;
        self.analysis_pending = Some(request);
        self.analysis = AnalysisPanel::Loading;
        info!(session = %self.id, request, symptoms = self.session.symptoms.len(), "Requesting analysis");

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        let snapshot = self.session.clone();
        tokio::spawn(async move {
            let result = backend.analyze(&snapshot).await;
            let _ = tx.send(EngineEvent::AnalysisReady { request, result });
        });
    }

    // ── Event loop ──────────────────────────────────────────────────

    /// Apply one completed piece of deferred work.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Search(SearchEvent::DebounceElapsed { ticket, query }) => {
                if let Some(query) = self.search.on_debounce_elapsed(ticket, query) {
                    debug!(session = %self.id, query = %query, "Dispatching suggestion request");
                    self.spawn_suggest(query);
                }
            }
            EngineEvent::Search(SearchEvent::SuggestionsLoaded { query, result }) => {
                self.search.on_suggestions_loaded(query, result, &self.session);
            }
            EngineEvent::FollowUpReplied { round, result } => {
                if self.followup.on_reply(round, result) == RoundOutcome::Completed {
                    self.finish_followup();
                }
            }
            EngineEvent::AnalysisReady { request, result } => {
                if self.analysis_pending != Some(request) {
                    debug!(session = %self.id, request, "Ignoring superseded analysis");
                } else {
                    self.analysis_pending = None;
                    self.analysis = match result {
                        Ok(payload) => {
                            info!(session = %self.id, request, "Analysis received");
                            AnalysisPanel::Ready(results::render(&payload))
                        }
                        Err(e) => {
                            warn!(session = %self.id, request, error = %e, "Analysis request failed");
                            AnalysisPanel::Failed
                        }
                    };
                }
            }
        }
        self.render();
    }

    /// Wait for and apply the next completion. Returns false without waiting
    /// when nothing is outstanding.
    pub async fn next_event(&mut self) -> bool {
        if self.is_idle() {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply completions until nothing is outstanding. A backend that never
    /// answers keeps this waiting.
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    /// Drive the engine from an action stream until it closes. Returns the
    /// final session.
    pub async fn run(mut self, mut actions: UnboundedReceiver<Action>) -> SessionState {
        self.render();
        loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => {
                        let _ = self.dispatch(action);
                    }
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }
        info!(session = %self.id, step = %self.wizard.current(), "Intake session ended");
        self.session
    }

    fn render(&mut self) {
        if self.presenter.is_none() {
            return;
        }
        let view = self.view();
        if let Some(presenter) = self.presenter.as_mut() {
            presenter.render(&view);
        }
    }
}
