//! Chat orchestrator
//!
//! Drives one interaction end to end:
//!
//! 1. check the input length, then the tracing credentials
//! 2. stream the chain's answer into the display surface
//! 3. save the exchange to memory
//! 4. record the run and publish its trace link
//!
//! Ratings and history resets go through the same type so every host (web
//! page, REPL, one-shot CLI) shares the rules.

use futures::StreamExt;
use sdk::errors::CodifyError;
use sdk::types::{Backend, FeedbackRecord, RunId, RunRecord};
use std::collections::HashMap;
use std::sync::Arc;

use super::display::{DisplaySurface, CURSOR};
use super::feedback::{self, FeedbackInput};
use super::session::{SessionContext, SessionState};
use crate::config::Config;
use crate::langsmith::{
    FeedbackCreate, LangSmithConnector, RunCollector, TracingBackend, TracingConnector,
};
use crate::llm::chain::{ChainInput, ChatChain, CodeGeneratorChain};
use crate::llm::gemini::GeminiProvider;
use crate::llm::mistral::MistralProvider;
use crate::secrets::{SecretCache, SecretString, LANGSMITH_API_KEY};

/// Shown instead of calling the model when no usable LangSmith key is set
pub const CONFIGURATION_PROMPT: &str =
    "⚠️ Add your LangSmith API key to continue, or switch to the Demo key";

/// Placeholder of the manual key field; never a real key
pub const API_KEY_PLACEHOLDER: &str = "Your_LangSmith_Key_Here";

/// How a submission ended
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The model answered; `run` is set when the call was traced
    Completed {
        response: String,
        run: Option<RunRecord>,
    },

    /// Input discarded with a warning; the session is unchanged
    Rejected(String),

    /// Tracing credentials are missing
    ConfigurationRequired,
}

/// How a rating ended
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackOutcome {
    Recorded(FeedbackRecord),
    Rejected(String),
}

pub struct ChatOrchestrator {
    chains: HashMap<Backend, Arc<dyn ChatChain>>,
    connector: Arc<dyn TracingConnector>,
    secrets: Arc<SecretCache>,
    max_input_chars: usize,
    tags: Vec<String>,
}

impl ChatOrchestrator {
    pub fn new(
        chains: Vec<Arc<dyn ChatChain>>,
        connector: Arc<dyn TracingConnector>,
        secrets: Arc<SecretCache>,
        max_input_chars: usize,
        tags: Vec<String>,
    ) -> Self {
        let chains = chains
            .into_iter()
            .map(|chain| (chain.backend(), chain))
            .collect();

        Self {
            chains,
            connector,
            secrets,
            max_input_chars,
            tags,
        }
    }

    /// Wire both hosted backends and the LangSmith client from configuration
    pub fn from_config(config: &Config, secrets: Arc<SecretCache>) -> Self {
        let gemini = Arc::new(GeminiProvider::new(
            config.llm.gemini.clone(),
            secrets.clone(),
        ));
        let mistral = Arc::new(MistralProvider::new(
            config.llm.mistral.clone(),
            secrets.clone(),
        ));

        let chains: Vec<Arc<dyn ChatChain>> = vec![
            Arc::new(CodeGeneratorChain::new(Backend::Gemini, gemini)),
            Arc::new(CodeGeneratorChain::new(Backend::Mistral, mistral)),
        ];

        Self::new(
            chains,
            Arc::new(LangSmithConnector::from_config(&config.langsmith)),
            secrets,
            config.chat.max_input_chars,
            config.langsmith.tags.clone(),
        )
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// LangSmith key for the session, `None` when missing, blank or the placeholder
    pub fn resolve_credentials(
        &self,
        session: &SessionContext,
    ) -> Result<Option<SecretString>, CodifyError> {
        if session.settings.project_name.trim().is_empty() {
            return Ok(None);
        }

        let key = if session.settings.use_demo_key {
            self.secrets.find_secret(LANGSMITH_API_KEY)?
        } else {
            session.settings.manual_api_key.clone()
        };

        Ok(key.filter(|k| !k.is_blank() && k.unsecure().trim() != API_KEY_PLACEHOLDER))
    }

    /// Run one interaction.
    ///
    /// Chain and tracing failures are returned as errors after the session
    /// has been reset to `Idle`.
    pub async fn submit(
        &self,
        session: &mut SessionContext,
        user_text: &str,
        backend: Backend,
        surface: &mut dyn DisplaySurface,
    ) -> Result<SubmitOutcome, CodifyError> {
        let length = user_text.chars().count();
        if length > self.max_input_chars {
            let message = CodifyError::InputTooLong {
                length,
                limit: self.max_input_chars,
            }
            .to_string();
            tracing::info!(length, limit = self.max_input_chars, "Rejected oversized input");
            surface.warning(&message);
            // The configuration notice is independent of the input
            if matches!(self.resolve_credentials(session), Ok(None)) {
                surface.configuration_required(CONFIGURATION_PROMPT);
            }
            return Ok(SubmitOutcome::Rejected(message));
        }

        let Some(api_key) = self.resolve_credentials(session)? else {
            surface.configuration_required(CONFIGURATION_PROMPT);
            return Ok(SubmitOutcome::ConfigurationRequired);
        };

        match self
            .run_interaction(session, user_text, backend, api_key, surface)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(backend = %backend, "Interaction failed: {}", e);
                session.transition(SessionState::Idle);
                Err(e)
            }
        }
    }

    async fn run_interaction(
        &self,
        session: &mut SessionContext,
        user_text: &str,
        backend: Backend,
        api_key: SecretString,
        surface: &mut dyn DisplaySurface,
    ) -> Result<SubmitOutcome, CodifyError> {
        session.transition(SessionState::AwaitingResponse);
        session.backend = backend;
        session.run = None;
        session.feedback = None;

        surface.user_message(user_text);

        let chain = self
            .chains
            .get(&backend)
            .cloned()
            .ok_or_else(|| CodifyError::UnknownBackend(backend.to_string()))?;

        let tracer = self.connector.connect(api_key)?;
        let collector = Arc::new(RunCollector::new(
            tracer.clone(),
            session.settings.project_name.clone(),
            self.tags.clone(),
        ));

        let input = ChainInput {
            user_query: user_text.to_string(),
            chat_history: session.memory.window(),
        };

        tracing::info!(
            backend = %backend,
            history = input.chat_history.len(),
            "Invoking chain"
        );

        let mut stream = chain.invoke_streaming(&input, collector.clone()).await?;
        session.transition(SessionState::Streaming);

        let mut full_response = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            full_response.push_str(&chunk.text);
            surface.assistant_partial(&format!("{}{}", full_response, CURSOR), &chunk.text);
        }
        drop(stream);

        surface.assistant_final(&full_response);
        session.memory.save_context(user_text, full_response.as_str());
        session.transition(SessionState::Completed);

        // Only the root run is kept; the collector starts empty for the next call
        let Some(run_id) = collector.take_traced_runs().into_iter().next() else {
            tracing::warn!("Chain finished without reporting a run");
            session.transition(SessionState::Idle);
            return Ok(SubmitOutcome::Completed {
                response: full_response,
                run: None,
            });
        };

        // The run is only kept once the tracing backend has it
        session.run = Some(RunRecord::new(run_id));
        let url = match self
            .record_trace(session, &collector, tracer.as_ref())
            .await
        {
            Ok(url) => url,
            Err(e) => {
                session.run = None;
                return Err(e);
            }
        };
        surface.trace_link(&url);
        session.transition(SessionState::FeedbackPending);

        Ok(SubmitOutcome::Completed {
            response: full_response,
            run: session.run.clone(),
        })
    }

    /// Wait for pending run submissions, then publish the session's run
    pub async fn record_trace(
        &self,
        session: &mut SessionContext,
        collector: &RunCollector,
        tracer: &dyn TracingBackend,
    ) -> Result<String, CodifyError> {
        collector.flush().await?;

        let run = session.run.as_mut().ok_or(CodifyError::NoActiveRun)?;
        let url = tracer.share_run(run.run_id).await?;
        run.trace_url = Some(url.clone());

        Ok(url)
    }

    /// Rate the session's latest run, at most once
    pub async fn submit_feedback(
        &self,
        session: &mut SessionContext,
        run_id: RunId,
        input: FeedbackInput,
        surface: &mut dyn DisplaySurface,
    ) -> Result<FeedbackOutcome, CodifyError> {
        let style = session.feedback_style;

        let Some(score) = feedback::score_for(style, &input.score) else {
            let err = CodifyError::UnmappedFeedbackScore {
                style: style.to_string(),
                score: input.score.clone(),
            };
            return Ok(reject(err, surface));
        };

        if session.run.as_ref().map(|r| r.run_id) != Some(run_id) {
            return Ok(reject(CodifyError::NoActiveRun, surface));
        }

        if session.feedback.as_ref().is_some_and(|f| f.run_id == run_id) {
            return Ok(reject(
                CodifyError::FeedbackAlreadyRecorded(run_id.to_string()),
                surface,
            ));
        }

        let Some(api_key) = self.resolve_credentials(session)? else {
            surface.configuration_required(CONFIGURATION_PROMPT);
            return Ok(FeedbackOutcome::Rejected(CONFIGURATION_PROMPT.to_string()));
        };

        let tracer = self.connector.connect(api_key)?;
        let record = tracer
            .create_feedback(&FeedbackCreate {
                run_id,
                key: feedback::feedback_key(style, &input.score),
                score,
                comment: input.comment(),
            })
            .await?;

        session.feedback = Some(record.clone());
        session.transition(SessionState::Idle);

        Ok(FeedbackOutcome::Recorded(record))
    }

    /// Empty the conversation and drop the trace link
    pub fn clear_history(&self, session: &mut SessionContext) {
        tracing::info!("Clearing message history");
        session.clear_history();
    }
}

fn reject(error: CodifyError, surface: &mut dyn DisplaySurface) -> FeedbackOutcome {
    let message = error.to_string();
    surface.warning(&message);
    FeedbackOutcome::Rejected(message)
}
