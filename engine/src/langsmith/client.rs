use super::{FeedbackCreate, Result, RunCreate, RunUpdate, TracingBackend, TracingConnector, TracingError};
use crate::config::LangSmithConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use sdk::types::{FeedbackRecord, RunId};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// REST client for the LangSmith API
pub struct LangSmithClient {
    endpoint: String,
    web_url: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl LangSmithClient {
    pub fn new(
        endpoint: impl Into<String>,
        web_url: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            web_url: web_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("x-api-key", self.api_key.unsecure())
    }

    /// Send a request, mapping transport failures and non-success statuses
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| TracingError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => TracingError::Unauthorized(body),
            404 => TracingError::NotFound(body),
            code => TracingError::Rejected { status: code, body },
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| TracingError::Parse(e.to_string()))
    }

    /// Public link for a share token
    pub fn public_url(&self, share_token: &str) -> String {
        format!("{}/public/{}/r", self.web_url, share_token)
    }
}

#[derive(serde::Deserialize)]
struct ShareResponse {
    share_token: String,
}

#[derive(serde::Deserialize)]
struct FeedbackResponse {
    id: Option<String>,
}

#[async_trait]
impl TracingBackend for LangSmithClient {
    async fn create_run(&self, run: &RunCreate) -> Result<()> {
        tracing::debug!(run_id = %run.id, "Posting run");
        self.send(self.request(reqwest::Method::POST, "/runs").json(run))
            .await?;
        Ok(())
    }

    async fn update_run(&self, run_id: RunId, update: &RunUpdate) -> Result<()> {
        tracing::debug!(run_id = %run_id, "Patching run");
        let path = format!("/runs/{}", run_id);
        self.send(self.request(reqwest::Method::PATCH, &path).json(update))
            .await?;
        Ok(())
    }

    async fn share_run(&self, run_id: RunId) -> Result<String> {
        let path = format!("/runs/{}/share", run_id);
        let body = json!({
            "run_id": run_id,
            "share_token": Uuid::new_v4(),
        });

        let response: ShareResponse = self
            .send_json(self.request(reqwest::Method::PUT, &path).json(&body))
            .await?;

        let url = self.public_url(&response.share_token);
        tracing::info!(run_id = %run_id, "Shared run at {}", url);
        Ok(url)
    }

    async fn create_feedback(&self, feedback: &FeedbackCreate) -> Result<FeedbackRecord> {
        let id = Uuid::new_v4().to_string();
        let body = json!({
            "id": id,
            "run_id": feedback.run_id,
            "key": feedback.key,
            "score": feedback.score,
            "comment": feedback.comment,
            "feedback_source": {"type": "api"},
        });

        let response: FeedbackResponse = self
            .send_json(self.request(reqwest::Method::POST, "/feedback").json(&body))
            .await?;

        tracing::info!(run_id = %feedback.run_id, key = %feedback.key, "Recorded feedback");

        Ok(FeedbackRecord {
            id: response.id.unwrap_or(id),
            run_id: feedback.run_id,
            key: feedback.key.clone(),
            score: feedback.score,
            comment: feedback.comment.clone(),
        })
    }
}

/// Connects a [`LangSmithClient`] per session key
#[derive(Debug, Clone)]
pub struct LangSmithConnector {
    endpoint: String,
    web_url: String,
}

impl LangSmithConnector {
    pub fn new(endpoint: impl Into<String>, web_url: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            web_url: web_url.into(),
        }
    }

    pub fn from_config(config: &LangSmithConfig) -> Self {
        Self::new(config.endpoint.clone(), config.web_url.clone())
    }
}

impl TracingConnector for LangSmithConnector {
    fn connect(&self, api_key: SecretString) -> Result<Arc<dyn TracingBackend>> {
        if api_key.is_blank() {
            return Err(TracingError::Unauthorized("empty API key".to_string()));
        }
        Ok(Arc::new(LangSmithClient::new(
            self.endpoint.clone(),
            self.web_url.clone(),
            api_key,
        )))
    }
}
