//! Inference backend — the three request/response contracts the engine
//! depends on.
//!
//! - **Suggest**: `{input}` → list of symptom names
//! - **Advance intake**: full session → next question or completion
//! - **Analyze**: full session → conditions, tests and urgency
//!
//! `HttpBackend` speaks them over JSON/HTTP. Tests substitute scripted
//! implementations of `IntakeBackend`.

pub mod http;
pub mod types;

pub use http::HttpBackend;
pub use types::{
    AnalysisPayload, Condition, FollowUpQuestion, FollowUpReply, QuestionKind, RecommendedTest,
    Urgency,
};

use async_trait::async_trait;

use crate::error::BackendError;
use crate::session::SessionState;

/// The remote symptom-analysis service.
#[async_trait]
pub trait IntakeBackend: Send + Sync {
    /// Symptom names matching a partial query (possibly empty).
    async fn suggest(&self, input: &str) -> Result<Vec<String>, BackendError>;

    /// Submit the session and get the next follow-up question, or completion.
    async fn advance_intake(&self, session: &SessionState) -> Result<FollowUpReply, BackendError>;

    /// Submit the session for final analysis.
    async fn analyze(&self, session: &SessionState) -> Result<AnalysisPayload, BackendError>;
}
