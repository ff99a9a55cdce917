use super::{Result, RunCreate, RunUpdate, TracingBackend, TracingError};
use crate::llm::chain::{ChainCallbacks, RunStart};
use chrono::Utc;
use sdk::types::RunId;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

enum TraceOp {
    Create(Box<RunCreate>),
    Update(RunId, RunUpdate),
    Flush(oneshot::Sender<Result<()>>),
}

/// Callback sink recording the root runs of one interaction.
///
/// Chain callbacks are synchronous, so submissions are queued to a worker
/// task that talks to the backend in order. [`RunCollector::flush`] waits for
/// everything queued so far and reports the first failure since the last flush.
pub struct RunCollector {
    traced_runs: Mutex<Vec<RunId>>,
    project: String,
    tags: Vec<String>,
    queue: mpsc::UnboundedSender<TraceOp>,
}

impl RunCollector {
    /// Spawns the submission worker; must be called inside a Tokio runtime
    pub fn new(backend: Arc<dyn TracingBackend>, project: impl Into<String>, tags: Vec<String>) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(backend, rx));

        Self {
            traced_runs: Mutex::new(Vec::new()),
            project: project.into(),
            tags,
            queue,
        }
    }

    /// Root runs seen so far, in start order; the list is reset
    pub fn take_traced_runs(&self) -> Vec<RunId> {
        let mut runs = self.traced_runs.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *runs)
    }

    /// Wait until every queued submission has reached the backend
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(TraceOp::Flush(tx));
        rx.await
            .map_err(|_| TracingError::Network("trace worker stopped".to_string()))?
    }

    fn enqueue(&self, op: TraceOp) {
        if self.queue.send(op).is_err() {
            tracing::warn!("Trace worker is gone, dropping submission");
        }
    }
}

async fn run_worker(backend: Arc<dyn TracingBackend>, mut rx: mpsc::UnboundedReceiver<TraceOp>) {
    let mut first_error: Option<TracingError> = None;

    while let Some(op) = rx.recv().await {
        let outcome = match op {
            TraceOp::Create(run) => backend.create_run(&run).await,
            TraceOp::Update(run_id, update) => backend.update_run(run_id, &update).await,
            TraceOp::Flush(reply) => {
                let result = match first_error.take() {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
                let _ = reply.send(result);
                continue;
            }
        };

        if let Err(e) = outcome {
            tracing::warn!("Trace submission failed: {}", e);
            first_error.get_or_insert(e);
        }
    }
}

impl ChainCallbacks for RunCollector {
    fn on_chain_start(&self, run: &RunStart) {
        self.traced_runs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(run.run_id);

        self.enqueue(TraceOp::Create(Box::new(RunCreate {
            id: run.run_id,
            name: run.name.clone(),
            run_type: "chain".to_string(),
            inputs: run.inputs.clone(),
            start_time: run.start_time,
            session_name: self.project.clone(),
            tags: self.tags.clone(),
            extra: serde_json::json!({ "metadata": run.metadata }),
        })));
    }

    fn on_chain_end(&self, run_id: RunId, outputs: Value) {
        self.enqueue(TraceOp::Update(
            run_id,
            RunUpdate {
                end_time: Utc::now(),
                outputs: Some(outputs),
                error: None,
            },
        ));
    }

    fn on_chain_error(&self, run_id: RunId, error: &str) {
        self.enqueue(TraceOp::Update(
            run_id,
            RunUpdate {
                end_time: Utc::now(),
                outputs: None,
                error: Some(error.to_string()),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sdk::types::FeedbackRecord;
    use serde_json::json;

    use crate::langsmith::FeedbackCreate;

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
        fail_updates: bool,
    }

    #[async_trait]
    impl TracingBackend for Journal {
        async fn create_run(&self, run: &RunCreate) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("create {} {}", run.session_name, run.tags.join(",")));
            Ok(())
        }

        async fn update_run(&self, _run_id: RunId, update: &RunUpdate) -> Result<()> {
            if self.fail_updates {
                return Err(TracingError::Rejected {
                    status: 500,
                    body: "down".to_string(),
                });
            }
            let kind = if update.error.is_some() { "error" } else { "end" };
            self.calls.lock().unwrap().push(format!("update {}", kind));
            Ok(())
        }

        async fn share_run(&self, run_id: RunId) -> Result<String> {
            Ok(format!("https://example.test/{}", run_id))
        }

        async fn create_feedback(&self, _feedback: &FeedbackCreate) -> Result<FeedbackRecord> {
            Err(TracingError::Parse("unused".to_string()))
        }
    }

    fn start(run_id: RunId) -> RunStart {
        RunStart {
            run_id,
            name: "CodeGeneratorChain".to_string(),
            inputs: json!({"user_query": "hi"}),
            start_time: Utc::now(),
            metadata: json!({}),
        }
    }

    #[tokio::test]
    async fn test_submissions_are_ordered() {
        let journal = Arc::new(Journal::default());
        let collector = RunCollector::new(journal.clone(), "Codify Demo", vec!["Codify Chat".into()]);

        let run_id = RunId::new();
        collector.on_chain_start(&start(run_id));
        collector.on_chain_end(run_id, json!({"text": "hello"}));
        collector.flush().await.unwrap();

        assert_eq!(
            *journal.calls.lock().unwrap(),
            vec![
                "create Codify Demo Codify Chat".to_string(),
                "update end".to_string()
            ]
        );
        assert_eq!(collector.take_traced_runs(), vec![run_id]);
        assert!(collector.take_traced_runs().is_empty());
    }

    #[tokio::test]
    async fn test_flush_reports_failure_once() {
        let journal = Arc::new(Journal {
            fail_updates: true,
            ..Default::default()
        });
        let collector = RunCollector::new(journal, "p", vec![]);

        let run_id = RunId::new();
        collector.on_chain_start(&start(run_id));
        collector.on_chain_error(run_id, "boom");

        assert!(matches!(
            collector.flush().await,
            Err(TracingError::Rejected { status: 500, .. })
        ));
        assert!(collector.flush().await.is_ok());
    }
}
