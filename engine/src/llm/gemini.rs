use super::{sse, ChatChunk, ChunkStream, LLMError, LLMProvider, Message, MessageRole};
use crate::config::GeminiConfig;
use crate::secrets::{SecretCache, GEMINI_API_KEY};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GeminiProvider {
    config: GeminiConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }

    /// Request body for `streamGenerateContent`
    fn build_payload(&self, messages: &[Message]) -> Value {
        let mut contents = Vec::new();
        let mut system_instruction = None;

        for msg in messages {
            if msg.role == MessageRole::System {
                system_instruction = Some(json!({
                    "parts": [{"text": msg.content}]
                }));
                continue;
            }

            contents.push(json!({
                "role": if msg.role == MessageRole::Assistant { "model" } else { "user" },
                "parts": [{"text": msg.content}]
            }));
        }

        let mut payload = serde_json::Map::new();
        payload.insert("contents".to_string(), json!(contents));
        payload.insert(
            "generationConfig".to_string(),
            json!({ "temperature": self.config.temperature }),
        );

        if let Some(sys) = system_instruction {
            payload.insert("systemInstruction".to_string(), sys);
        }

        Value::Object(payload)
    }
}

/// Extract the text of one streamed `GenerateContentResponse`.
///
/// Returns `Ok(None)` for events that carry no text (safety ratings, usage).
fn parse_event(data: &str) -> super::Result<Option<ChatChunk>> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| LLMError::ParseError(e.to_string()))?;

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        return Err(LLMError::ProviderUnavailable(format!(
            "Gemini stream error: {}",
            message
        )));
    }

    let parts = value
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let Some(parts) = parts else {
        return Ok(None);
    };

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ChatChunk::new(text)))
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.get_secret(GEMINI_API_KEY).is_ok()
    }

    async fn stream(&self, messages: &[Message]) -> super::Result<ChunkStream> {
        let api_key = self
            .secret_cache
            .get_secret(GEMINI_API_KEY)
            .map_err(LLMError::from_secret)?;

        let url = format!(
            "{}/models/{}:streamGenerateContent",
            self.config.base_url, self.config.model
        );

        tracing::debug!(model = %self.config.model, messages = messages.len(), "Gemini stream request");

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse"), ("key", api_key.unsecure())])
            .header("Content-Type", "application/json")
            .json(&self.build_payload(messages))
            .send()
            .await
            .map_err(LLMError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status("Gemini", status, text));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| e.without_url()));

        let chunks = sse::data_events(body).filter_map(|event| async move {
            match event {
                Ok(data) => parse_event(&data).transpose(),
                Err(e) => Some(Err(e)),
            }
        });

        Ok(chunks.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretManager;

    fn provider() -> GeminiProvider {
        let cache = SecretCache::new(Arc::new(SecretManager::new("codify-test")));
        GeminiProvider::new(GeminiConfig::default(), Arc::new(cache))
    }

    #[test]
    fn test_payload_maps_roles() {
        let payload = provider().build_payload(&[
            Message::system("You are Codify"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("reverse a list"),
        ]);

        assert_eq!(
            payload["systemInstruction"]["parts"][0]["text"],
            "You are Codify"
        );
        let contents = payload["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "reverse a list");
    }

    #[test]
    fn test_parse_event_joins_parts() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Use "},{"text":"reversed()"}]}}]}"#;
        assert_eq!(
            parse_event(data).unwrap(),
            Some(ChatChunk::new("Use reversed()"))
        );
    }

    #[test]
    fn test_parse_event_without_text() {
        let data = r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{}}"#;
        assert_eq!(parse_event(data).unwrap(), None);
    }

    #[test]
    fn test_parse_event_error_object() {
        let data = r#"{"error":{"code":500,"message":"internal"}}"#;
        assert!(matches!(
            parse_event(data),
            Err(LLMError::ProviderUnavailable(_))
        ));
    }
}
