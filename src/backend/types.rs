//! Request/response contracts with the inference backend.

use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Input control a follow-up question asks for.
///
/// Travels as the backend's widget name ("slider", "checkbox", "text").
/// Unknown names fall back to free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    Scale,
    MultiSelect,
    #[default]
    FreeText,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scale => "slider",
            Self::MultiSelect => "checkbox",
            Self::FreeText => "text",
        }
    }
}

impl From<String> for QuestionKind {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "slider" | "scale" => Self::Scale,
            "checkbox" | "multi-select" | "multi_select" => Self::MultiSelect,
            _ => Self::FreeText,
        }
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A follow-up question generated by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FollowUpQuestion {
    pub fn scale(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            kind: QuestionKind::Scale,
            options: Vec::new(),
        }
    }

    pub fn multi_select<I, S>(question: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            question: question.into(),
            kind: QuestionKind::MultiSelect,
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn free_text(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            kind: QuestionKind::FreeText,
            options: Vec::new(),
        }
    }
}

/// What the backend wants next in the follow-up loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUpReply {
    Completed,
    Question(FollowUpQuestion),
}

/// Raw advance-intake body: `{completed: true}` or `{question: {...}}`.
#[derive(Debug, Deserialize)]
struct AdvanceResponse {
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    question: Option<FollowUpQuestion>,
}

impl FollowUpReply {
    /// Decode an advance-intake response body.
    pub fn from_json(endpoint: &str, body: &str) -> Result<Self, BackendError> {
        let raw: AdvanceResponse =
            serde_json::from_str(body).map_err(|e| BackendError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        if raw.completed {
            return Ok(Self::Completed);
        }
        match raw.question {
            Some(q) if !q.question.trim().is_empty() => Ok(Self::Question(q)),
            _ => Err(BackendError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: "neither completed nor a question".to_string(),
            }),
        }
    }
}

/// A candidate condition in the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    /// 0–100.
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub explanation: String,
}

/// A diagnostic test the backend recommends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedTest {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// Severity level of the analysis. Unrecognized levels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Routine,
    Urgent,
    Emergency,
    Other(String),
}

impl Urgency {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Routine => "routine",
            Self::Urgent => "urgent",
            Self::Emergency => "emergency",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for Urgency {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            "routine" => Self::Routine,
            "urgent" => Self::Urgent,
            "emergency" => Self::Emergency,
            _ => Self::Other(s.trim().to_string()),
        }
    }
}

impl From<Urgency> for String {
    fn from(u: Urgency) -> Self {
        u.as_str().to_string()
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The backend's final diagnostic output. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<RecommendedTest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
}
