use super::{sse, ChatChunk, ChunkStream, LLMError, LLMProvider, Message};
use crate::config::MistralConfig;
use crate::secrets::{SecretCache, MISTRAL_API_KEY};
use async_trait::async_trait;
use futures::{future, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;

/// Sentinel payload closing an OpenAI-style completion stream
const DONE_MARKER: &str = "[DONE]";

pub struct MistralProvider {
    config: MistralConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl MistralProvider {
    pub fn new(config: MistralConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }

    fn build_payload(&self, messages: &[Message]) -> Value {
        let messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role.to_string(), "content": m.content}))
            .collect();

        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "stream": true,
        })
    }
}

/// Extract `choices[0].delta.content` from one completion chunk
fn parse_event(data: &str) -> super::Result<Option<ChatChunk>> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| LLMError::ParseError(e.to_string()))?;

    let content = value
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default();

    if content.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ChatChunk::new(content)))
    }
}

#[async_trait]
impl LLMProvider for MistralProvider {
    fn name(&self) -> &str {
        "mistral"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.get_secret(MISTRAL_API_KEY).is_ok()
    }

    async fn stream(&self, messages: &[Message]) -> super::Result<ChunkStream> {
        let api_key = self
            .secret_cache
            .get_secret(MISTRAL_API_KEY)
            .map_err(LLMError::from_secret)?;

        let url = format!("{}/chat/completions", self.config.base_url);

        tracing::debug!(model = %self.config.model, messages = messages.len(), "Mistral stream request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.unsecure())
            .header("Accept", "text/event-stream")
            .json(&self.build_payload(messages))
            .send()
            .await
            .map_err(LLMError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status("Mistral", status, text));
        }

        let chunks = sse::data_events(response.bytes_stream())
            .take_while(|event| {
                future::ready(!matches!(event, Ok(data) if data.trim() == DONE_MARKER))
            })
            .filter_map(|event| async move {
                match event {
                    Ok(data) => parse_event(&data).transpose(),
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(chunks.boxed())
    }
}
