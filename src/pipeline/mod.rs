//! Pipeline Orchestrator
//!
//! One run binds a query and a staged document to the stage table and folds
//! over it: each stage sees the outputs of every stage before it, and the
//! last stage's output is the run's result. Any failure aborts the run.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::agents::{AgentExecutor, AgentRegistry, RunContext, StageKind, TaskOutput};
use crate::config::Config;
use crate::documents::DocumentProcessor;
use crate::llm::LLM;
use crate::search::{SearchProvider, SerpApiClient};
use crate::types::{AppError, AppResult};

/// Lifecycle of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Pending,
    Verifying,
    Analyzing,
    Advising,
    Assessing,
    Complete,
    Failed,
}

impl RunState {
    /// State a run is in while `stage` executes
    pub fn for_stage(stage: StageKind) -> Self {
        match stage {
            StageKind::Verification => RunState::Verifying,
            StageKind::Analysis => RunState::Analyzing,
            StageKind::Investment => RunState::Advising,
            StageKind::Risk => RunState::Assessing,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed)
    }

    /// Move to the next state; terminal states have no successor.
    pub fn advance(self) -> AppResult<Self> {
        let next = match self {
            RunState::Pending => RunState::Verifying,
            RunState::Verifying => RunState::Analyzing,
            RunState::Analyzing => RunState::Advising,
            RunState::Advising => RunState::Assessing,
            RunState::Assessing => RunState::Complete,
            RunState::Complete | RunState::Failed => {
                return Err(AppError::orchestration(
                    "Pipeline",
                    format!("cannot advance a {} run", self),
                ))
            }
        };
        Ok(next)
    }

    /// `Failed` is reachable from any non-terminal state and absorbs.
    pub fn fail(self) -> Self {
        match self {
            RunState::Complete => RunState::Complete,
            _ => RunState::Failed,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Pending => "pending",
            RunState::Verifying => "verifying",
            RunState::Analyzing => "analyzing",
            RunState::Advising => "advising",
            RunState::Assessing => "assessing",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    /// Output of the final stage
    pub result: String,
    pub stages: Vec<TaskOutput>,
}

/// The immutable orchestrator shared by every request
pub struct Pipeline {
    registry: AgentRegistry,
    executor: AgentExecutor,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(registry: AgentRegistry, executor: AgentExecutor, timeout: Duration) -> Self {
        Self {
            registry,
            executor,
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let llm = LLM::from_config(&config.llm);
        let search: Arc<dyn SearchProvider> = Arc::new(SerpApiClient::from_config(&config.search));
        info!(
            provider = llm.provider_name(),
            model = llm.model(),
            timeout_secs = config.pipeline.timeout_secs,
            "Pipeline configured"
        );

        Ok(Self::new(
            AgentRegistry::financial_analysis()?,
            AgentExecutor::new(llm, search, config.pipeline.max_document_chars),
            Duration::from_secs(config.pipeline.timeout_secs),
        ))
    }

    /// Run every stage against `document_path` within the overall deadline.
    ///
    /// Dropping the run on timeout cancels whatever LLM or search call is in
    /// flight.
    pub async fn run(&self, query: &str, document_path: &Path) -> AppResult<PipelineOutcome> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id);

        match tokio::time::timeout(self.timeout, self.run_stages(run_id, query, document_path))
            .instrument(span)
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(%run_id, timeout_secs = self.timeout.as_secs(), "Pipeline run timed out");
                Err(AppError::Timeout(self.timeout.as_secs()))
            }
        }
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        query: &str,
        document_path: &Path,
    ) -> AppResult<PipelineOutcome> {
        let mut state = RunState::Pending;
        info!(
            query_len = query.len(),
            document = %document_path.display(),
            state = %state,
            "Starting pipeline run"
        );

        let document_text = match DocumentProcessor::read(document_path).await {
            Ok(text) => text,
            Err(e) => {
                error!(state = %state.fail(), error = %e, "Pipeline run failed");
                return Err(e);
            }
        };

        let mut outputs: Vec<TaskOutput> = Vec::with_capacity(self.registry.stages().len());
        for stage in self.registry.stages() {
            state = state.advance()?;
            debug_assert_eq!(state, RunState::for_stage(stage.kind));
            info!(state = %state, stage = %stage.kind, "Entering stage");

            let context = RunContext {
                query,
                document_path,
                document_text: &document_text,
                prior: &outputs,
            };

            match self.executor.execute(stage, &context).await {
                Ok(output) => {
                    info!(
                        stage = %stage.kind,
                        output_len = output.output.len(),
                        search_degraded = output.search_degraded,
                        "Stage complete"
                    );
                    outputs.push(output);
                }
                Err(e) => {
                    state = state.fail();
                    error!(state = %state, stage = %stage.kind, error = %e, "Pipeline run failed");
                    return Err(e);
                }
            }
        }

        state = state.advance()?;
        let result = outputs
            .last()
            .map(|o| o.output.clone())
            .ok_or_else(|| AppError::orchestration("Pipeline", "no stages were executed"))?;

        info!(state = %state, result_len = result.len(), "Pipeline run complete");

        Ok(PipelineOutcome {
            run_id,
            result,
            stages: outputs,
        })
    }
}
