//! Code-generator chain
//!
//! A chain binds the Codify prompt to one provider and reports its lifecycle
//! to a [`ChainCallbacks`] sink: start when invoked, end once the stream is
//! exhausted, error if the provider fails before or during streaming.

use super::prompt::PromptTemplate;
use super::{ChatChunk, ChunkStream, LLMError, LLMProvider, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use sdk::types::{Backend, RunId, Turn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Input of one chain invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainInput {
    pub user_query: String,
    pub chat_history: Vec<Turn>,
}

/// Root run announced by a chain when it starts
#[derive(Debug, Clone)]
pub struct RunStart {
    pub run_id: RunId,
    pub name: String,
    pub inputs: Value,
    pub start_time: DateTime<Utc>,
    pub metadata: Value,
}

/// Observer of chain runs
pub trait ChainCallbacks: Send + Sync {
    fn on_chain_start(&self, run: &RunStart);

    fn on_chain_end(&self, run_id: RunId, outputs: Value);

    fn on_chain_error(&self, run_id: RunId, error: &str);
}

/// A prompt chain that streams its answer
#[async_trait]
pub trait ChatChain: Send + Sync {
    /// Backend this chain sends requests to
    fn backend(&self) -> Backend;

    async fn invoke_streaming(
        &self,
        input: &ChainInput,
        callbacks: Arc<dyn ChainCallbacks>,
    ) -> Result<ChunkStream>;
}

/// System prompt + history + question, answered by a single provider
pub struct CodeGeneratorChain {
    backend: Backend,
    provider: Arc<dyn LLMProvider>,
    prompt: PromptTemplate,
}

impl CodeGeneratorChain {
    pub const NAME: &'static str = "CodeGeneratorChain";

    pub fn new(backend: Backend, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            backend,
            provider,
            prompt: PromptTemplate::default(),
        }
    }

    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }
}

struct TracedStream {
    inner: ChunkStream,
    callbacks: Arc<dyn ChainCallbacks>,
    run_id: RunId,
    text: String,
}

/// Forward fragments while accumulating them, closing the run on exhaustion
fn traced(inner: ChunkStream, callbacks: Arc<dyn ChainCallbacks>, run_id: RunId) -> ChunkStream {
    let state = TracedStream {
        inner,
        callbacks,
        run_id,
        text: String::new(),
    };

    stream::unfold(Some(state), |state: Option<TracedStream>| async move {
        let Some(mut st) = state else {
            return None;
        };
        match st.inner.next().await {
            Some(Ok(chunk)) => {
                st.text.push_str(&chunk.text);
                Some((Ok::<ChatChunk, LLMError>(chunk), Some(st)))
            }
            Some(Err(e)) => {
                st.callbacks.on_chain_error(st.run_id, &e.to_string());
                Some((Err(e), None))
            }
            None => {
                st.callbacks.on_chain_end(st.run_id, json!({ "text": st.text }));
                None
            }
        }
    })
    .boxed()
}

#[async_trait]
impl ChatChain for CodeGeneratorChain {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn invoke_streaming(
        &self,
        input: &ChainInput,
        callbacks: Arc<dyn ChainCallbacks>,
    ) -> Result<ChunkStream> {
        let run_id = RunId::new();
        let inputs = serde_json::to_value(input).map_err(|e| LLMError::ParseError(e.to_string()))?;

        callbacks.on_chain_start(&RunStart {
            run_id,
            name: Self::NAME.to_string(),
            inputs,
            start_time: Utc::now(),
            metadata: json!({
                "ls_provider": self.provider.name(),
                "ls_model_name": self.provider.model(),
            }),
        });

        let messages = self.prompt.format(&input.chat_history, &input.user_query);

        match self.provider.stream(&messages).await {
            Ok(inner) => Ok(traced(inner, callbacks, run_id)),
            Err(e) => {
                tracing::warn!(backend = %self.backend, "Chain invocation failed: {}", e);
                callbacks.on_chain_error(run_id, &e.to_string());
                Err(e)
            }
        }
    }
}
