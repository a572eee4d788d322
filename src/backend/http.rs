//! JSON-over-HTTP client for the inference backend.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::IntakeConfig;
use crate::error::BackendError;
use crate::session::SessionState;

use super::IntakeBackend;
use super::types::{AnalysisPayload, FollowUpReply};

pub const SUGGEST_PATH: &str = "/get_symptoms";
pub const ADVANCE_PATH: &str = "/submit_symptoms";
pub const ANALYZE_PATH: &str = "/analyze";

/// Backend reached over HTTP. No request timeout is set.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(config.backend_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST `body` and return the raw response text of a 2xx reply.
    async fn post_text<B>(&self, path: &str, body: &B) -> Result<String, BackendError>
    where
        B: Serialize + ?Sized,
    {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Request {
                endpoint: path.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| BackendError::Request {
            endpoint: path.to_string(),
            reason: format!("failed to read body: {e}"),
        })?;

        if !status.is_success() {
            tracing::warn!(endpoint = path, status = status.as_u16(), "Backend returned error status");
            return Err(BackendError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let text = self.post_text(path, body).await?;
        serde_json::from_str(&text).map_err(|e| BackendError::InvalidResponse {
            endpoint: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl IntakeBackend for HttpBackend {
    async fn suggest(&self, input: &str) -> Result<Vec<String>, BackendError> {
        let body = serde_json::json!({ "input": input });
        self.post_json(SUGGEST_PATH, &body).await
    }

    async fn advance_intake(&self, session: &SessionState) -> Result<FollowUpReply, BackendError> {
        let text = self.post_text(ADVANCE_PATH, session).await?;
        FollowUpReply::from_json(ADVANCE_PATH, &text)
    }

    async fn analyze(&self, session: &SessionState) -> Result<AnalysisPayload, BackendError> {
        self.post_json(ANALYZE_PATH, session).await
    }
}
