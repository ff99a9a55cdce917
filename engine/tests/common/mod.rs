//! In-memory collaborators shared by the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use codify_engine::chat::{ChatOrchestrator, SessionContext};
use codify_engine::config::Config;
use codify_engine::langsmith::{
    FeedbackCreate, RunCreate, RunUpdate, TracingBackend, TracingConnector, TracingError,
};
use codify_engine::llm::chain::{ChatChain, CodeGeneratorChain};
use codify_engine::llm::{ChatChunk, ChunkStream, LLMError, LLMProvider, Message};
use codify_engine::secrets::{SecretCache, SecretManager, SecretString, LANGSMITH_API_KEY};
use futures::stream::{self, StreamExt};
use sdk::types::{Backend, FeedbackRecord, RunId};
use std::sync::{Arc, Mutex};

pub const DEMO_KEY: &str = "lsv2_pt_demo_key_for_tests_0000000000";

/// Answers every request with the same fragments
pub struct ScriptedProvider {
    fragments: Vec<String>,
    failure: Option<LLMError>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: LLMError) -> Self {
        Self {
            fragments: Vec::new(),
            failure: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Vec<Message> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn stream(&self, messages: &[Message]) -> Result<ChunkStream, LLMError> {
        self.requests.lock().unwrap().push(messages.to_vec());

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let chunks: Vec<Result<ChatChunk, LLMError>> = self
            .fragments
            .iter()
            .map(|f| Ok(ChatChunk::new(f.clone())))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// Records every tracing call
#[derive(Default)]
pub struct MemoryTracer {
    pub runs: Mutex<Vec<RunCreate>>,
    pub updates: Mutex<Vec<(RunId, RunUpdate)>>,
    pub shared: Mutex<Vec<RunId>>,
    pub feedback: Mutex<Vec<FeedbackCreate>>,
    pub fail_feedback: bool,
    pub fail_create_run: bool,
    pub fail_update_run: bool,
    pub fail_share: bool,
}

fn unavailable() -> TracingError {
    TracingError::Rejected {
        status: 500,
        body: "down".to_string(),
    }
}

impl MemoryTracer {
    pub fn feedback_count(&self) -> usize {
        self.feedback.lock().unwrap().len()
    }
}

#[async_trait]
impl TracingBackend for MemoryTracer {
    async fn create_run(&self, run: &RunCreate) -> Result<(), TracingError> {
        if self.fail_create_run {
            return Err(unavailable());
        }
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn update_run(&self, run_id: RunId, update: &RunUpdate) -> Result<(), TracingError> {
        if self.fail_update_run {
            return Err(unavailable());
        }
        self.updates.lock().unwrap().push((run_id, update.clone()));
        Ok(())
    }

    async fn share_run(&self, run_id: RunId) -> Result<String, TracingError> {
        if self.fail_share {
            return Err(unavailable());
        }
        self.shared.lock().unwrap().push(run_id);
        Ok(format!("https://smith.example/public/{}/r", run_id))
    }

    async fn create_feedback(
        &self,
        feedback: &FeedbackCreate,
    ) -> Result<FeedbackRecord, TracingError> {
        if self.fail_feedback {
            return Err(TracingError::Rejected {
                status: 500,
                body: "feedback store down".to_string(),
            });
        }

        let mut stored = self.feedback.lock().unwrap();
        stored.push(feedback.clone());
        Ok(FeedbackRecord {
            id: format!("fb-{}", stored.len()),
            run_id: feedback.run_id,
            key: feedback.key.clone(),
            score: feedback.score,
            comment: feedback.comment.clone(),
        })
    }
}

/// Hands out the same [`MemoryTracer`] and remembers the keys it was given
pub struct MemoryConnector {
    pub tracer: Arc<MemoryTracer>,
    pub keys: Mutex<Vec<String>>,
}

impl TracingConnector for MemoryConnector {
    fn connect(&self, api_key: SecretString) -> Result<Arc<dyn TracingBackend>, TracingError> {
        self.keys.lock().unwrap().push(api_key.unsecure().to_string());
        let tracer: Arc<dyn TracingBackend> = self.tracer.clone();
        Ok(tracer)
    }
}

pub struct Harness {
    pub orchestrator: ChatOrchestrator,
    pub provider: Arc<ScriptedProvider>,
    pub tracer: Arc<MemoryTracer>,
    pub connector: Arc<MemoryConnector>,
    pub secrets: Arc<SecretCache>,
}

impl Harness {
    pub fn new(fragments: &[&str]) -> Self {
        Self::with(ScriptedProvider::new(fragments), MemoryTracer::default())
    }

    pub fn with(provider: ScriptedProvider, tracer: MemoryTracer) -> Self {
        let provider = Arc::new(provider);
        let tracer = Arc::new(tracer);
        let connector = Arc::new(MemoryConnector {
            tracer: tracer.clone(),
            keys: Mutex::new(Vec::new()),
        });

        let secrets = Arc::new(SecretCache::new(Arc::new(SecretManager::new(
            "codify-test",
        ))));
        secrets.insert(LANGSMITH_API_KEY, SecretString::new(DEMO_KEY));

        let chains: Vec<Arc<dyn ChatChain>> = Backend::ALL
            .iter()
            .map(|backend| {
                let chain: Arc<dyn ChatChain> =
                    Arc::new(CodeGeneratorChain::new(*backend, provider.clone()));
                chain
            })
            .collect();

        let orchestrator = ChatOrchestrator::new(
            chains,
            connector.clone(),
            secrets.clone(),
            500,
            vec!["Codify Chat".to_string()],
        );

        Self {
            orchestrator,
            provider,
            tracer,
            connector,
            secrets,
        }
    }

    /// Session with default settings (demo key on, project "Codify Demo")
    pub fn session(&self) -> SessionContext {
        SessionContext::new(&Config::default_config())
    }
}
