//! Follow-up conductor — the adaptive question loop.
//!
//! Each round submits the whole session to the backend and either asks the
//! returned question or ends the loop on `completed`. Rounds are numbered so
//! a reply that arrives after the patient left the step is discarded.

use tracing::{debug, info, warn};

use crate::backend::{FollowUpQuestion, FollowUpReply, QuestionKind};
use crate::error::BackendError;
use crate::session::{FollowUpAnswer, SessionState};

pub const SCALE_MIN: u8 = 1;
pub const SCALE_MAX: u8 = 10;
pub const SCALE_DEFAULT: u8 = 5;

/// The control a question should be answered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUpInput {
    Scale { min: u8, max: u8, default: u8 },
    MultiSelect { options: Vec<String> },
    FreeText,
}

impl FollowUpInput {
    pub fn for_question(question: &FollowUpQuestion) -> Self {
        match question.kind {
            QuestionKind::Scale => Self::Scale {
                min: SCALE_MIN,
                max: SCALE_MAX,
                default: SCALE_DEFAULT,
            },
            QuestionKind::MultiSelect => Self::MultiSelect {
                options: question.options.clone(),
            },
            QuestionKind::FreeText => Self::FreeText,
        }
    }
}

/// A question ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpPrompt {
    pub question: String,
    pub input: FollowUpInput,
}

/// What the follow-up area shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FollowUpPanel {
    #[default]
    Idle,
    /// Waiting on the backend.
    Waiting,
    Asking(FollowUpPrompt),
    /// The last round failed; nothing more will happen until the step is
    /// re-entered.
    Stalled,
}

/// Outcome of a backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The reply belonged to an abandoned round.
    Ignored,
    /// A question is now waiting for the patient.
    Asking,
    /// The loop is finished.
    Completed,
    /// The round failed and the loop stopped.
    Stalled,
}

/// Outcome of the patient answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// No question was pending.
    Ignored,
    /// Answer recorded; submit the session for this round.
    NextRound(u64),
    /// Answer recorded and the configured round limit was hit.
    LimitReached,
}

#[derive(Debug, Default)]
pub struct FollowUpConductor {
    max_rounds: Option<u32>,
    round: u64,
    awaiting_reply: Option<u64>,
    question: Option<FollowUpQuestion>,
    answered: u32,
    stalled: bool,
}

impl FollowUpConductor {
    pub fn new(max_rounds: Option<u32>) -> Self {
        Self {
            max_rounds,
            ..Self::default()
        }
    }

    /// Begin a fresh loop. Returns the round number to submit for.
    pub fn start(&mut self) -> u64 {
        self.reset();
        info!("Starting follow-up loop");
        self.next_round()
    }

    /// Abandon the loop. Any reply still in flight will be ignored.
    pub fn cancel(&mut self) {
        if self.awaiting_reply.is_some() || self.question.is_some() {
            debug!(round = self.round, "Follow-up loop abandoned");
        }
        self.reset();
    }

    pub fn is_waiting(&self) -> bool {
        self.awaiting_reply.is_some()
    }

    pub fn current_question(&self) -> Option<&FollowUpQuestion> {
        self.question.as_ref()
    }

    pub fn answered(&self) -> u32 {
        self.answered
    }

    pub fn panel(&self) -> FollowUpPanel {
        if let Some(q) = &self.question {
            FollowUpPanel::Asking(FollowUpPrompt {
                question: q.question.clone(),
                input: FollowUpInput::for_question(q),
            })
        } else if self.awaiting_reply.is_some() {
            FollowUpPanel::Waiting
        } else if self.stalled {
            FollowUpPanel::Stalled
        } else {
            FollowUpPanel::Idle
        }
    }

    /// Apply the backend's reply for `round`.
    pub fn on_reply(&mut self, round: u64, result: Result<FollowUpReply, BackendError>) -> RoundOutcome {
        if self.awaiting_reply != Some(round) {
            debug!(round, "Ignoring follow-up reply for abandoned round");
            return RoundOutcome::Ignored;
        }
        self.awaiting_reply = None;

        match result {
            Ok(FollowUpReply::Completed) => {
                info!(round, answered = self.answered, "Follow-up loop completed");
                RoundOutcome::Completed
            }
            Ok(FollowUpReply::Question(q)) => {
                debug!(round, kind = q.kind.as_str(), question = %q.question, "Follow-up question");
                self.question = Some(q);
                RoundOutcome::Asking
            }
            Err(e) => {
                warn!(round, error = %e, "Follow-up request failed; loop halted");
                self.stalled = true;
                RoundOutcome::Stalled
            }
        }
    }

    /// Record the patient's answer to the pending question.
    pub fn answer(&mut self, answer: FollowUpAnswer, session: &mut SessionState) -> AnswerOutcome {
        let Some(question) = self.question.take() else {
            debug!("Follow-up answer with no pending question");
            return AnswerOutcome::Ignored;
        };

        let answer = shape_answer(&question, answer);
        if session.record_answer(question.question.clone(), answer).is_some() {
            debug!(question = %question.question, "Follow-up answer replaced an earlier one");
        }
        self.answered += 1;

        if self.max_rounds.is_some_and(|max| self.answered >= max) {
            warn!(answered = self.answered, "Follow-up round limit reached");
            return AnswerOutcome::LimitReached;
        }
        AnswerOutcome::NextRound(self.next_round())
    }

    fn next_round(&mut self) -> u64 {
        self.round += 1;
        self.awaiting_reply = Some(self.round);
        self.round
    }

    fn reset(&mut self) {
        self.awaiting_reply = None;
        self.question = None;
        self.answered = 0;
        self.stalled = false;
    }
}

/// Fit an answer to the question's control so the recorded value always has
/// the shape its type declares: a number in 1..=10 for scale questions, a
/// list of options for multi-select, a string for everything else.
fn shape_answer(question: &FollowUpQuestion, answer: FollowUpAnswer) -> FollowUpAnswer {
    match question.kind {
        QuestionKind::Scale => FollowUpAnswer::Scale(match answer {
            FollowUpAnswer::Scale(v) => v.clamp(SCALE_MIN, SCALE_MAX),
            FollowUpAnswer::Text(t) => scale_from_text(&t),
            FollowUpAnswer::Choices(c) => match c.as_slice() {
                [only] => scale_from_text(only),
                _ => SCALE_DEFAULT,
            },
        }),
        QuestionKind::MultiSelect => FollowUpAnswer::Choices(match answer {
            FollowUpAnswer::Choices(c) => c,
            FollowUpAnswer::Text(t) => t
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            FollowUpAnswer::Scale(v) => vec![v.to_string()],
        }),
        QuestionKind::FreeText => FollowUpAnswer::Text(match answer {
            FollowUpAnswer::Text(t) => t,
            FollowUpAnswer::Scale(v) => v.to_string(),
            FollowUpAnswer::Choices(c) => c.join(", "),
        }),
    }
}

/// Parse a typed scale value, falling back to the default when it is not a
/// number.
fn scale_from_text(text: &str) -> u8 {
    match text.trim().parse::<i64>() {
        Ok(v) => v.clamp(SCALE_MIN.into(), SCALE_MAX.into()) as u8,
        Err(_) => {
            debug!(answer = text, "Non-numeric scale answer; using the default");
            SCALE_DEFAULT
        }
    }
}
